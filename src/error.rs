//! 에러 타입 정의

use thiserror::Error;

/// PTS 시뮬레이터 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("네트워크 경로 없음: 시나리오에 최소 1개의 경로 필요")]
    NoPathConfigured,

    #[error("유효하지 않은 FEC 파라미터: n={n}, k={k} (k > 0, n > k 필요)")]
    InvalidFecParams { n: usize, k: usize },

    #[error("유효하지 않은 청크 크기: {size}")]
    InvalidChunkSize { size: usize },

    #[error("알 수 없는 시나리오: {name}")]
    UnknownScenario { name: String },

    #[error("유효하지 않은 우선순위: {value} (P0/P1/P2 중 선택)")]
    InvalidPriority { value: String },

    #[error("시나리오 {scenario}에 정의되지 않은 우선순위: {priority}")]
    PriorityNotConfigured { scenario: String, priority: String },

    #[error("빈 페이로드: 최소 1바이트 필요")]
    EmptyPayload,

    #[error("알 수 없는 에러: {0}")]
    Unknown(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
