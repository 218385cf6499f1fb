//! 청크와 분할기 정의
//!
//! - Chunk: 전송 단위 (데이터 / 패리티 / 백그라운드)
//! - ChunkBuilder: 페이로드 분할 + FEC 그룹 배정 + 패리티 자리표시 생성

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::fec::{FecGroup, GroupId};
use crate::{Error, Result};

/// 우선순위 클래스 (레인)
///
/// 라벨 오름차순(P0 < P1 < P2)이 곧 순회 순서이며, 스케줄링 출력에
/// 영향을 주는 모든 반복은 이 순서를 따른다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    /// 최고 긴급 레인
    P0,

    /// 중간 레인
    P1,

    /// 대용량 / 저긴급 레인
    P2,
}

impl Priority {
    /// 전체 우선순위 (라벨 오름차순)
    pub const ALL: [Priority; 3] = [Priority::P0, Priority::P1, Priority::P2];

    /// 라벨 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "P0" => Ok(Priority::P0),
            "P1" => Ok(Priority::P1),
            "P2" => Ok(Priority::P2),
            _ => Err(Error::InvalidPriority {
                value: s.to_string(),
            }),
        }
    }
}

/// 청크 (전송 단위)
///
/// 식별자와 지문은 생성 시점에 확정되며 이후 변경되지 않는다.
/// 지문은 페이로드 바이트의 순수 함수 (crc32)이다.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 런 내 고유 식별자 (c{i} / p{g}_{j} / bg_{prio}_{suffix})
    id: String,

    /// 우선순위 클래스
    priority: Priority,

    /// 페이로드 바이트
    payload: Bytes,

    /// 마감시간 (스케줄 시작 기준 상대 초)
    deadline: f64,

    /// FEC 그룹 ID
    group: GroupId,

    /// 패리티 청크 여부
    is_parity: bool,

    /// 페이로드 지문 (생성 시 1회 계산)
    fingerprint: u32,
}

impl Chunk {
    /// 새 청크 생성
    pub fn new(
        id: String,
        priority: Priority,
        payload: Bytes,
        deadline: f64,
        group: GroupId,
        is_parity: bool,
    ) -> Self {
        let fingerprint = crc32fast::hash(&payload);
        Self {
            id,
            priority,
            payload,
            deadline,
            group,
            is_parity,
            fingerprint,
        }
    }

    /// 식별자
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 우선순위
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// 페이로드
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// 페이로드 크기 (바이트)
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// 마감시간 (초)
    pub fn deadline(&self) -> f64 {
        self.deadline
    }

    /// FEC 그룹 ID
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// 패리티 여부
    pub fn is_parity(&self) -> bool {
        self.is_parity
    }

    /// 페이로드 지문
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// 로깅용 지문 접두부 (8자리 16진수)
    pub fn fingerprint_prefix(&self) -> String {
        format!("{:08x}", self.fingerprint)
    }

    /// 실제 페이로드에서 유래한 데이터 청크 여부 (id 계보 기준)
    pub fn is_payload_data(&self) -> bool {
        !self.is_parity && self.id.starts_with('c')
    }

    /// 실제 페이로드에서 유래한 패리티 청크 여부 (id 계보 기준)
    pub fn is_payload_parity(&self) -> bool {
        self.is_parity && self.id.starts_with('p')
    }

    /// 합성 백그라운드 트래픽 여부
    pub fn is_background(&self) -> bool {
        self.id.starts_with("bg_")
    }
}

/// 페이로드 분할기
///
/// 우선순위 레인 1개의 설정으로 페이로드를 고정 크기 데이터 청크와
/// 그룹별 패리티 자리표시로 분할한다. 동일 입력에 대해 항상 동일한
/// 청크 수 / id / 그룹 배정을 생성한다.
#[derive(Debug, Clone)]
pub struct ChunkBuilder {
    chunk_size: usize,
    deadline: f64,
    fec_n: usize,
    fec_k: usize,
}

impl ChunkBuilder {
    /// 새 분할기 생성, FEC 파라미터 검증 포함
    pub fn new(chunk_size: usize, deadline: f64, fec: (usize, usize)) -> Result<Self> {
        let (n, k) = fec;
        if k == 0 || n <= k {
            return Err(Error::InvalidFecParams { n, k });
        }
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize { size: chunk_size });
        }
        Ok(Self {
            chunk_size,
            deadline,
            fec_n: n,
            fec_k: k,
        })
    }

    /// 그룹당 패리티 수 (n - k)
    pub fn parity_per_group(&self) -> usize {
        self.fec_n - self.fec_k
    }

    /// 페이로드 분할
    ///
    /// 데이터 청크 ceil(len / chunk_size)개를 생성하고 마지막 청크는
    /// 0으로 패딩한다. 데이터 청크 index는 그룹 index / k에 배정되며
    /// 그룹마다 패리티 자리표시 n - k개가 뒤따른다. 패리티 페이로드는
    /// 복구 가능한 내용이 아닌 결정적 채움 바이트이다.
    pub fn split_payload(
        &self,
        priority: Priority,
        payload: &[u8],
    ) -> (Vec<Chunk>, BTreeMap<GroupId, FecGroup>) {
        let parity_count = self.parity_per_group();
        let total_chunks = (payload.len() + self.chunk_size - 1) / self.chunk_size;
        let group_count = (total_chunks + self.fec_k - 1) / self.fec_k;

        let mut chunks = Vec::with_capacity(total_chunks + group_count * parity_count);
        let mut groups: BTreeMap<GroupId, FecGroup> = BTreeMap::new();

        for index in 0..total_chunks {
            let start = index * self.chunk_size;
            let end = (start + self.chunk_size).min(payload.len());
            let piece = if end - start < self.chunk_size {
                let mut padded = vec![0u8; self.chunk_size];
                padded[..end - start].copy_from_slice(&payload[start..end]);
                Bytes::from(padded)
            } else {
                Bytes::copy_from_slice(&payload[start..end])
            };

            let group = (index / self.fec_k) as GroupId;
            chunks.push(Chunk::new(
                format!("c{}", index),
                priority,
                piece,
                self.deadline,
                group,
                false,
            ));
            groups
                .entry(group)
                .or_insert_with(|| FecGroup::new(parity_count));
        }

        for group_index in 0..group_count {
            for parity_idx in 0..parity_count {
                let filler = Bytes::from(vec![(parity_idx % 256) as u8; self.chunk_size]);
                chunks.push(Chunk::new(
                    format!("p{}_{}", group_index, parity_idx),
                    priority,
                    filler,
                    self.deadline,
                    group_index as GroupId,
                    true,
                ));
            }
        }

        (chunks, groups)
    }
}

/// 백그라운드 트래픽 청크 생성
///
/// WFQ 경쟁을 가시화하기 위한 합성 청크. 스케줄링/전송은 실제 청크와
/// 동일하게 취급되지만 id 계보(bg_ 접두)로 전송 성과 집계에서 제외된다.
pub fn background_chunk(
    priority: Priority,
    chunk_size: usize,
    deadline: f64,
    rng: &mut impl Rng,
) -> Chunk {
    let suffix: u32 = rng.gen_range(0..=9999);
    Chunk::new(
        format!("bg_{}_{}", priority, suffix),
        priority,
        Bytes::from(vec![0u8; chunk_size]),
        deadline,
        0,
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_priority_order_and_parse() {
        assert!(Priority::P0 < Priority::P1);
        assert!(Priority::P1 < Priority::P2);
        assert_eq!("p1".parse::<Priority>().unwrap(), Priority::P1);
        assert!("P9".parse::<Priority>().is_err());
    }

    #[test]
    fn test_segmentation_counts() {
        // 2 MiB, 32 KiB 청크, RS(16, 11) -> 데이터 64, 그룹 6, 패리티 30
        let payload = vec![0xA5u8; 2 * 1024 * 1024];
        let builder = ChunkBuilder::new(32 * 1024, 2.0, (16, 11)).unwrap();
        let (chunks, groups) = builder.split_payload(Priority::P0, &payload);

        let data: Vec<_> = chunks.iter().filter(|c| !c.is_parity()).collect();
        let parity: Vec<_> = chunks.iter().filter(|c| c.is_parity()).collect();
        assert_eq!(data.len(), 64);
        assert_eq!(groups.len(), 6);
        assert_eq!(parity.len(), 6 * (16 - 11));
    }

    #[test]
    fn test_final_chunk_zero_padded() {
        let payload: Vec<u8> = (0..250u32).map(|i| i as u8).collect();
        let builder = ChunkBuilder::new(100, 1.0, (4, 2)).unwrap();
        let (chunks, _) = builder.split_payload(Priority::P1, &payload);

        let data: Vec<_> = chunks.iter().filter(|c| !c.is_parity()).collect();
        assert_eq!(data.len(), 3);
        for chunk in &data {
            assert_eq!(chunk.size(), 100);
        }
        // 마지막 조각 50바이트 + 0 패딩 50바이트
        let last = data.last().unwrap();
        assert_eq!(&last.payload()[..50], &payload[200..250]);
        assert!(last.payload()[50..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_group_assignment_follows_index() {
        let payload = vec![1u8; 700];
        let builder = ChunkBuilder::new(100, 1.0, (5, 3)).unwrap();
        let (chunks, groups) = builder.split_payload(Priority::P2, &payload);

        // 데이터 7개 -> 그룹 3개 (index / 3)
        assert_eq!(groups.len(), 3);
        for chunk in chunks.iter().filter(|c| !c.is_parity()) {
            let index: usize = chunk.id()[1..].parse().unwrap();
            assert_eq!(chunk.group(), (index / 3) as GroupId);
        }
        // 그룹마다 패리티 2개
        let parity_count = chunks.iter().filter(|c| c.is_parity()).count();
        assert_eq!(parity_count, 3 * 2);
        assert_eq!(groups.values().next().unwrap().parity_total(), 2);
    }

    #[test]
    fn test_invalid_fec_params_rejected() {
        assert!(matches!(
            ChunkBuilder::new(100, 1.0, (16, 0)),
            Err(Error::InvalidFecParams { .. })
        ));
        assert!(matches!(
            ChunkBuilder::new(100, 1.0, (11, 11)),
            Err(Error::InvalidFecParams { .. })
        ));
        assert!(matches!(
            ChunkBuilder::new(100, 1.0, (10, 16)),
            Err(Error::InvalidFecParams { .. })
        ));
        assert!(matches!(
            ChunkBuilder::new(0, 1.0, (16, 11)),
            Err(Error::InvalidChunkSize { .. })
        ));
    }

    #[test]
    fn test_fingerprint_is_pure_function_of_payload() {
        let a = Chunk::new(
            "c0".into(),
            Priority::P0,
            Bytes::from_static(b"hello"),
            1.0,
            0,
            false,
        );
        let b = Chunk::new(
            "c1".into(),
            Priority::P2,
            Bytes::from_static(b"hello"),
            9.0,
            3,
            false,
        );
        let c = Chunk::new(
            "c2".into(),
            Priority::P0,
            Bytes::from_static(b"world"),
            1.0,
            0,
            false,
        );
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint_prefix().len(), 8);
    }

    #[test]
    fn test_split_is_deterministic() {
        let payload = vec![7u8; 12345];
        let builder = ChunkBuilder::new(1000, 2.0, (6, 4)).unwrap();
        let (first, _) = builder.split_payload(Priority::P0, &payload);
        let (second, _) = builder.split_payload(Priority::P0, &payload);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.id(), b.id());
            assert_eq!(a.group(), b.group());
            assert_eq!(a.fingerprint(), b.fingerprint());
        }
    }

    #[test]
    fn test_id_lineage() {
        let payload = vec![1u8; 100];
        let builder = ChunkBuilder::new(100, 1.0, (3, 2)).unwrap();
        let (chunks, _) = builder.split_payload(Priority::P0, &payload);
        assert!(chunks.iter().any(|c| c.is_payload_data()));
        assert!(chunks.iter().any(|c| c.is_payload_parity()));
        assert!(chunks.iter().all(|c| !c.is_background()));

        let mut rng = StdRng::seed_from_u64(1);
        let bg = background_chunk(Priority::P1, 64, 5.0, &mut rng);
        assert!(bg.is_background());
        assert!(!bg.is_payload_data());
        assert!(!bg.is_payload_parity());
        assert!(bg.id().starts_with("bg_P1_"));
    }

    #[test]
    fn test_empty_payload_yields_no_chunks() {
        let builder = ChunkBuilder::new(100, 1.0, (4, 2)).unwrap();
        let (chunks, groups) = builder.split_payload(Priority::P0, &[]);
        assert!(chunks.is_empty());
        assert!(groups.is_empty());
    }
}
