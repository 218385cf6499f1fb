//! WFQ + EDF 스케줄러
//!
//! - PriorityQueueSet: 레인별 전송 대기열 (적재 시 id 오름차순)
//! - wfq_batch: 라운드당 가중 비례 배치 선택
//! - edf_sort: 배치 내 마감시간 오름차순 안정 정렬

use std::collections::{BTreeMap, VecDeque};

use crate::chunk::{Chunk, Priority};

/// 우선순위별 전송 대기열
///
/// 큐 순서는 적재 완료 후 id 오름차순(사전순)으로 1회 고정된다.
/// 마감시간 순서는 여기서 다루지 않고 배치 단위로 EDF가 적용한다.
/// 청크는 배치로 꺼낼 때 소비되며 다시 적재되지 않는다.
#[derive(Debug, Default)]
pub struct PriorityQueueSet {
    queues: BTreeMap<Priority, VecDeque<Chunk>>,
}

impl PriorityQueueSet {
    /// 주어진 레인들의 빈 큐 집합 생성
    pub fn new(priorities: impl IntoIterator<Item = Priority>) -> Self {
        let queues = priorities
            .into_iter()
            .map(|priority| (priority, VecDeque::new()))
            .collect();
        Self { queues }
    }

    /// 청크 적재 (해당 레인 큐 없으면 생성)
    pub fn enqueue(&mut self, chunk: Chunk) {
        self.queues
            .entry(chunk.priority())
            .or_default()
            .push_back(chunk);
    }

    /// 모든 큐를 id 오름차순으로 정렬 (초기 적재 후 1회 호출)
    pub fn sort_by_id(&mut self) {
        for queue in self.queues.values_mut() {
            let mut chunks: Vec<Chunk> = queue.drain(..).collect();
            chunks.sort_by(|a, b| a.id().cmp(b.id()));
            queue.extend(chunks);
        }
    }

    /// 대기 중인 총 청크 수
    pub fn len(&self) -> usize {
        self.queues.values().map(|queue| queue.len()).sum()
    }

    /// 전체 큐가 비었는지
    pub fn is_empty(&self) -> bool {
        self.queues.values().all(|queue| queue.is_empty())
    }

    /// 레인별 대기 길이
    pub fn queue_len(&self, priority: Priority) -> usize {
        self.queues.get(&priority).map_or(0, |queue| queue.len())
    }

    /// 비어있지 않은 레인 (라벨 오름차순)
    pub fn active_priorities(&self) -> Vec<Priority> {
        self.queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(&priority, _)| priority)
            .collect()
    }

    /// WFQ 배치 선택
    ///
    /// 비어있지 않은 각 레인에서 share = max(1, round(batch_size * weight /
    /// 활성 가중치 합))개를 큐 순서대로 꺼낸다 (남은 길이 상한). max(1, ..)
    /// 바닥은 모든 활성 레인이 매 라운드 최소 1개씩 전진함을 보장하며,
    /// 이것이 드레인 루프의 종료 조건이다. 레인 순회는 라벨 오름차순 고정.
    pub fn wfq_batch(
        &mut self,
        batch_size: usize,
        weights: &BTreeMap<Priority, u32>,
    ) -> Vec<Chunk> {
        let active = self.active_priorities();
        let total_weight: u32 = active
            .iter()
            .map(|priority| weights.get(priority).copied().unwrap_or(0))
            .sum();

        let mut batch = Vec::new();
        for priority in active {
            let weight = weights.get(&priority).copied().unwrap_or(0);
            let share = if total_weight == 0 {
                1
            } else {
                let raw = batch_size as f64 * weight as f64 / total_weight as f64;
                (raw.round() as usize).max(1)
            };

            if let Some(queue) = self.queues.get_mut(&priority) {
                let take = share.min(queue.len());
                for _ in 0..take {
                    if let Some(chunk) = queue.pop_front() {
                        batch.push(chunk);
                    }
                }
            }
        }
        batch
    }
}

/// EDF 정렬: 마감시간 오름차순 안정 정렬
///
/// 순수 함수. 마감시간이 같은 청크는 WFQ 출력 순서를 유지한다.
pub fn edf_sort(mut batch: Vec<Chunk>) -> Vec<Chunk> {
    batch.sort_by(|a, b| a.deadline().total_cmp(&b.deadline()));
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn chunk(id: &str, priority: Priority, deadline: f64) -> Chunk {
        Chunk::new(
            id.to_string(),
            priority,
            Bytes::from_static(b"x"),
            deadline,
            0,
            false,
        )
    }

    fn filled_set(counts: &[(Priority, usize, f64)]) -> PriorityQueueSet {
        let mut set = PriorityQueueSet::new(Priority::ALL);
        for &(priority, count, deadline) in counts {
            for i in 0..count {
                set.enqueue(chunk(
                    &format!("c{}_{}", priority, i),
                    priority,
                    deadline,
                ));
            }
        }
        set.sort_by_id();
        set
    }

    fn weights(p0: u32, p1: u32, p2: u32) -> BTreeMap<Priority, u32> {
        let mut map = BTreeMap::new();
        map.insert(Priority::P0, p0);
        map.insert(Priority::P1, p1);
        map.insert(Priority::P2, p2);
        map
    }

    #[test]
    fn test_wfq_shares_follow_weights() {
        let mut set = filled_set(&[
            (Priority::P0, 20, 2.0),
            (Priority::P1, 20, 8.0),
            (Priority::P2, 20, 30.0),
        ]);
        let batch = set.wfq_batch(12, &weights(8, 3, 1));

        // round(12*8/12)=8, round(12*3/12)=3, max(1, round(12*1/12))=1
        let count = |p: Priority| batch.iter().filter(|c| c.priority() == p).count();
        assert_eq!(count(Priority::P0), 8);
        assert_eq!(count(Priority::P1), 3);
        assert_eq!(count(Priority::P2), 1);
    }

    #[test]
    fn test_wfq_floor_guarantees_progress() {
        // P2 가중치가 아무리 작아도 배치마다 최소 1개
        let mut set = filled_set(&[
            (Priority::P0, 50, 2.0),
            (Priority::P2, 5, 30.0),
        ]);
        let batch = set.wfq_batch(10, &weights(100, 1, 1));
        assert!(batch.iter().any(|c| c.priority() == Priority::P2));
    }

    #[test]
    fn test_wfq_share_capped_by_queue_len() {
        let mut set = filled_set(&[(Priority::P0, 3, 2.0), (Priority::P1, 2, 8.0)]);
        let batch = set.wfq_batch(12, &weights(8, 3, 1));
        assert_eq!(batch.len(), 5);
        assert!(set.is_empty());
    }

    #[test]
    fn test_wfq_skips_empty_queues() {
        let mut set = filled_set(&[(Priority::P1, 4, 8.0)]);
        // 활성 가중치 합 = P1만 -> 전체 배치를 P1이 가져감
        let batch = set.wfq_batch(3, &weights(8, 3, 1));
        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|c| c.priority() == Priority::P1));
    }

    #[test]
    fn test_wfq_batch_order_is_deterministic() {
        let build = || {
            filled_set(&[
                (Priority::P0, 6, 2.0),
                (Priority::P1, 6, 8.0),
                (Priority::P2, 6, 30.0),
            ])
        };
        let batch_a = build().wfq_batch(12, &weights(8, 3, 1));
        let batch_b = build().wfq_batch(12, &weights(8, 3, 1));
        let ids_a: Vec<_> = batch_a.iter().map(|c| c.id().to_string()).collect();
        let ids_b: Vec<_> = batch_b.iter().map(|c| c.id().to_string()).collect();
        assert_eq!(ids_a, ids_b);

        // 레인 라벨 오름차순 블록 순서
        let priorities: Vec<_> = batch_a.iter().map(|c| c.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn test_wfq_drains_every_chunk_exactly_once() {
        let mut set = filled_set(&[
            (Priority::P0, 17, 2.0),
            (Priority::P1, 9, 8.0),
            (Priority::P2, 23, 30.0),
        ]);
        let total = set.len();
        let mut seen = std::collections::BTreeSet::new();
        let mut rounds = 0;

        while !set.is_empty() {
            let batch = set.wfq_batch(12, &weights(8, 3, 1));
            assert!(!batch.is_empty(), "비어있지 않은 큐에서 빈 배치");
            for chunk in batch {
                assert!(seen.insert(chunk.id().to_string()), "중복 소비");
            }
            rounds += 1;
            assert!(rounds <= total, "종료 실패");
        }
        assert_eq!(seen.len(), total);
    }

    #[test]
    fn test_queues_ordered_by_id_after_sort() {
        let mut set = PriorityQueueSet::new(Priority::ALL);
        for id in ["c3", "c1", "c10", "c2"] {
            set.enqueue(chunk(id, Priority::P0, 1.0));
        }
        set.sort_by_id();
        let batch = set.wfq_batch(10, &weights(1, 1, 1));
        let ids: Vec<_> = batch.iter().map(|c| c.id().to_string()).collect();
        // 사전순: c1 < c10 < c2 < c3
        assert_eq!(ids, vec!["c1", "c10", "c2", "c3"]);
    }

    #[test]
    fn test_edf_sort_non_decreasing() {
        let batch = vec![
            chunk("a", Priority::P0, 8.0),
            chunk("b", Priority::P1, 2.0),
            chunk("c", Priority::P2, 30.0),
            chunk("d", Priority::P0, 2.0),
        ];
        let sorted = edf_sort(batch);
        for pair in sorted.windows(2) {
            assert!(pair[0].deadline() <= pair[1].deadline());
        }
    }

    #[test]
    fn test_edf_sort_is_stable() {
        let batch = vec![
            chunk("first", Priority::P0, 2.0),
            chunk("second", Priority::P0, 2.0),
            chunk("third", Priority::P0, 1.0),
        ];
        let sorted = edf_sort(batch);
        let ids: Vec<_> = sorted.iter().map(|c| c.id().to_string()).collect();
        assert_eq!(ids, vec!["third", "first", "second"]);
    }

    #[test]
    fn test_empty_set() {
        let mut set = PriorityQueueSet::new(Priority::ALL);
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert!(set.wfq_batch(12, &weights(1, 1, 1)).is_empty());
    }
}
