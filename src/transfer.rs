//! 전송 오케스트레이터
//!
//! WFQ 배치 -> EDF 정렬 -> 경로 선택 -> 전송 -> FEC 계정의 루프를
//! 단일 순차 흐름으로 구동한다. 모든 확률적 결정은 하나의 시드된
//! RNG를 공유하므로 동일 시드는 동일한 이벤트/요약을 재현한다.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::chunk::{Chunk, ChunkBuilder, Priority};
use crate::config::Scenario;
use crate::fec::{FecGroup, GroupId};
use crate::multipath::PathManager;
use crate::scheduler::{edf_sort, PriorityQueueSet};
use crate::stats::{TransferStats, TransferSummary, TransmitEvent};
use crate::{Result, DEFAULT_BATCH_SIZE};

/// 전송 런 1회의 결과
#[derive(Debug, Clone)]
pub struct TransferReport {
    /// 청크별 전송 이벤트 (전송 순서)
    pub events: Vec<TransmitEvent>,

    /// 누적 카운터
    pub stats: TransferStats,

    /// 최종 요약
    pub summary: TransferSummary,
}

/// 전송 시뮬레이터
///
/// 생성 시 설정 검증 / 페이로드 분할 / 큐 적재를 마치고, run()이
/// 큐가 빌 때까지 스케줄링 루프를 구동한다. 상태 갱신은 전부 이
/// 단일 루프 안에서만 일어난다.
pub struct Simulator {
    scenario: Scenario,
    batch_size: usize,
    rng: StdRng,
    paths: PathManager,
    queues: PriorityQueueSet,
    groups: BTreeMap<GroupId, FecGroup>,
    stats: TransferStats,
    events: Vec<TransmitEvent>,
    /// 시뮬레이션 시계 (실현 지연의 누적, 초)
    clock_s: f64,
}

impl Simulator {
    /// 새 시뮬레이터 생성
    ///
    /// seed가 None이면 엔트로피 시드 (재현 불가, 의도된 동작).
    pub fn new(
        scenario: Scenario,
        priority: Priority,
        payload: &[u8],
        seed: Option<u64>,
    ) -> Result<Self> {
        scenario.validate()?;
        let config = scenario.priority_config(priority)?;

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // 백그라운드 생성이 분할보다 먼저 (RNG 소비 순서 고정)
        let background = scenario.background_chunks(priority, &mut rng);

        let builder = ChunkBuilder::new(config.chunk_size, config.deadline, config.fec)?;
        let (chunks, groups) = builder.split_payload(priority, payload);

        let stats = TransferStats {
            total_data_chunks: chunks.iter().filter(|c| !c.is_parity()).count() as u64,
            total_parity_chunks: chunks.iter().filter(|c| c.is_parity()).count() as u64,
            ..TransferStats::default()
        };

        let mut queues = PriorityQueueSet::new(scenario.priorities.keys().copied());
        for chunk in chunks.into_iter().chain(background) {
            queues.enqueue(chunk);
        }
        queues.sort_by_id();

        let paths = PathManager::from_scenario(&scenario)?;

        info!(
            "시뮬레이터 준비: 데이터 {} + 패리티 {} 청크, 그룹 {}개, 경로 {}개",
            stats.total_data_chunks,
            stats.total_parity_chunks,
            groups.len(),
            paths.path_count(),
        );

        Ok(Self {
            scenario,
            batch_size: DEFAULT_BATCH_SIZE,
            rng,
            paths,
            queues,
            groups,
            stats,
            events: Vec::new(),
            clock_s: 0.0,
        })
    }

    /// 라운드당 배치 크기 변경
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// 큐가 빌 때까지 스케줄링 루프 구동
    ///
    /// 종료는 WFQ의 max(1, ..) 바닥이 보장한다: 비어있지 않은 라운드마다
    /// 활성 레인당 최소 1개가 소비되어 총 청크 수가 단조 감소한다.
    pub fn run(mut self) -> TransferReport {
        let weights = self.scenario.weights();
        let mut batch_index = 0u64;

        while !self.queues.is_empty() {
            let batch = self.queues.wfq_batch(self.batch_size, &weights);
            if batch.is_empty() {
                break;
            }
            batch_index += 1;
            let batch = edf_sort(batch);
            debug!(
                "배치 {:02}: WFQ+EDF 후 {}개 청크",
                batch_index,
                batch.len()
            );

            for chunk in batch {
                self.transmit_chunk(chunk);
            }
        }

        self.stats.batches = batch_index;
        self.finish()
    }

    /// 청크 1개 전송 + 결과 분류
    fn transmit_chunk(&mut self, chunk: Chunk) {
        let index = self.paths.select_path(chunk.priority());
        let outcome = self.paths.transmit(index, &mut self.rng);
        self.clock_s += outcome.latency_ms / 1000.0;

        if outcome.delivered {
            if chunk.is_payload_parity() {
                self.stats.delivered_parity += 1;
            } else if chunk.is_payload_data() {
                self.stats.delivered_data += 1;
            } else {
                self.stats.background_delivered += 1;
            }
        } else {
            // FEC 계정은 페이로드 계보 청크만. 백그라운드는 합성
            // 트래픽이므로 그룹 카운터를 오염시키지 않는다.
            if chunk.is_payload_parity() || chunk.is_payload_data() {
                if let Some(group) = self.groups.get_mut(&chunk.group()) {
                    group.record_loss(chunk.is_parity());
                }
            }
            if chunk.is_payload_parity() {
                self.stats.lost_parity += 1;
            } else if chunk.is_payload_data() {
                self.stats.lost_data += 1;
            } else {
                self.stats.background_lost += 1;
            }
        }

        let path_name = self.paths.path_name(index).to_string();
        debug!(
            "[{}] {} {} ({:.1} ms{})",
            path_name,
            chunk.id(),
            if outcome.delivered { "delivered" } else { "LOST" },
            outcome.latency_ms,
            if outcome.brownout { ", brownout" } else { "" },
        );

        self.events.push(TransmitEvent {
            chunk_id: chunk.id().to_string(),
            priority: chunk.priority(),
            path_name,
            delivered: outcome.delivered,
            latency_ms: outcome.latency_ms,
            brownout_active: outcome.brownout,
            fingerprint_prefix: chunk.fingerprint_prefix(),
            is_parity: chunk.is_parity(),
        });
    }

    /// 그룹 리포트 집계 + 요약 작성
    fn finish(self) -> TransferReport {
        let mut recovered = 0u64;
        let mut unrecovered = 0u64;
        for group in self.groups.values() {
            let report = group.report();
            recovered += report.recovered as u64;
            unrecovered += report.unrecovered as u64;
        }

        let total = self.stats.total_data_chunks;
        let success_ratio = if total == 0 {
            1.0
        } else {
            (self.stats.delivered_data + recovered) as f64 / total as f64
        };

        let summary = TransferSummary {
            delivered_data: self.stats.delivered_data,
            total_data_chunks: total,
            delivered_parity: self.stats.delivered_parity,
            lost_parity: self.stats.lost_parity,
            recovered_via_fec: recovered,
            unrecovered,
            elapsed_s: self.clock_s,
            success_ratio,
            passed: unrecovered == 0,
        };

        info!("전송 완료: {}", summary.summary_line());

        TransferReport {
            events: self.events,
            stats: self.stats,
            summary,
        }
    }
}
