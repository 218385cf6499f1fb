//! 전송 통계와 이벤트 레코드
//!
//! 협력자(리포팅 레이어)가 그대로 소비할 수 있는 구조화 레코드.

use serde::{Deserialize, Serialize};

use crate::chunk::Priority;

/// 청크 1건의 전송 이벤트 (상세 로깅용)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmitEvent {
    /// 청크 식별자
    pub chunk_id: String,

    /// 우선순위 클래스
    pub priority: Priority,

    /// 전송에 사용된 경로 이름
    pub path_name: String,

    /// 전달 성공 여부
    pub delivered: bool,

    /// 실현 지연 (밀리초)
    pub latency_ms: f64,

    /// 브라운아웃 중 전송 여부
    pub brownout_active: bool,

    /// 페이로드 지문 접두부 (8자리 16진수)
    pub fingerprint_prefix: String,

    /// 패리티 청크 여부
    pub is_parity: bool,
}

/// 누적 전송 카운터 (증가 전용)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferStats {
    /// 페이로드 데이터 청크 총수
    pub total_data_chunks: u64,

    /// 페이로드 패리티 청크 총수
    pub total_parity_chunks: u64,

    /// 전달된 데이터 청크 수
    pub delivered_data: u64,

    /// 손실된 데이터 청크 수
    pub lost_data: u64,

    /// 전달된 패리티 청크 수
    pub delivered_parity: u64,

    /// 손실된 패리티 청크 수
    pub lost_parity: u64,

    /// 전달된 백그라운드 청크 수 (성과 집계 제외)
    pub background_delivered: u64,

    /// 손실된 백그라운드 청크 수 (성과 집계 제외)
    pub background_lost: u64,

    /// 실행된 스케줄링 라운드 수
    pub batches: u64,
}

/// 최종 요약 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSummary {
    /// 전달된 데이터 청크 수
    pub delivered_data: u64,

    /// 페이로드 데이터 청크 총수
    pub total_data_chunks: u64,

    /// 전달된 패리티 청크 수
    pub delivered_parity: u64,

    /// 손실된 패리티 청크 수
    pub lost_parity: u64,

    /// FEC로 복구된 데이터 손실 수
    pub recovered_via_fec: u64,

    /// 복구 불가능한 데이터 손실 수
    pub unrecovered: u64,

    /// 시뮬레이션 경과 시간 (초, 실현 지연의 누적)
    pub elapsed_s: f64,

    /// 실효 전달 비율 = (전달 + 복구) / 총 데이터 (총 0이면 1.0)
    pub success_ratio: f64,

    /// unrecovered == 0 이면 합격
    pub passed: bool,
}

impl TransferSummary {
    /// 요약 한 줄 문자열
    pub fn summary_line(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Data: {}/{} | Parity: {} ok / {} lost | FEC recovered: {} | Unrecovered: {} | Success: {:.1}% | {}",
            self.elapsed_s,
            self.delivered_data,
            self.total_data_chunks,
            self.delivered_parity,
            self.lost_parity,
            self.recovered_via_fec,
            self.unrecovered,
            self.success_ratio * 100.0,
            if self.passed { "PASS" } else { "FAIL" },
        )
    }
}
