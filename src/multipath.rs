//! 멀티패스 전송 모델
//!
//! - NetworkPath: 브라운아웃 상태머신을 가진 손실 경로
//! - PathManager: 경로 집합 소유 + 청크별 경로 선택

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chunk::Priority;
use crate::config::{PathConfig, Scenario};
use crate::{
    Error, Result, BROWNOUT_MAX_ATTEMPTS, BROWNOUT_MIN_ATTEMPTS, LATENCY_JITTER,
    MAX_EFFECTIVE_LOSS,
};

/// 전송 시도 1회의 결과
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransmitOutcome {
    /// 전달 성공 여부
    pub delivered: bool,

    /// 실현 지연 (밀리초, 지터 포함)
    pub latency_ms: f64,

    /// 이 시도가 브라운아웃 중이었는지
    pub brownout: bool,
}

/// 손실 네트워크 경로
///
/// 상태머신: Normal <-> Brownout. 진입은 시도당 확률로 결정되고,
/// 진입 시 남은 열화 시도 횟수를 1회 추첨한다. 진입한 시도 자체도
/// 열화 상태로 평가되며 카운트다운은 이후 시도부터 소비된다.
/// 브라운아웃 상태는 런 전체에 걸쳐 시도 사이에 유지된다.
#[derive(Debug, Clone)]
pub struct NetworkPath {
    /// 경로 이름
    name: String,

    /// 기준 지연 (밀리초)
    base_latency_ms: f64,

    /// 기준 손실률
    loss_rate: f64,

    /// 브라운아웃 진입 확률 (시도당)
    brownout_chance: f64,

    /// 브라운아웃 중 지연/손실 배수
    brownout_multiplier: f64,

    /// 남은 브라운아웃 시도 횟수 (0 = Normal)
    active_brownout: u32,
}

impl NetworkPath {
    /// 설정에서 경로 생성
    pub fn new(config: &PathConfig) -> Self {
        Self {
            name: config.name.clone(),
            base_latency_ms: config.base_latency_ms,
            loss_rate: config.loss_rate,
            brownout_chance: config.brownout_chance,
            brownout_multiplier: config.brownout_multiplier,
            active_brownout: 0,
        }
    }

    /// 경로 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 기준 지연 (밀리초)
    pub fn base_latency_ms(&self) -> f64 {
        self.base_latency_ms
    }

    /// 기준 손실률
    pub fn loss_rate(&self) -> f64 {
        self.loss_rate
    }

    /// 현재 브라운아웃 상태인지
    pub fn in_brownout(&self) -> bool {
        self.active_brownout > 0
    }

    /// 청크 1회 전송 시뮬레이션
    ///
    /// 추첨 순서 고정: 브라운아웃 판정(진입 시 지속 추첨) -> 지터 ->
    /// 전달 판정. 전달은 추첨값 >= 유효 손실률일 때 성공하므로
    /// 손실률 0 경로는 어떤 시드에서도 100% 전달한다.
    pub fn transmit(&mut self, rng: &mut impl Rng) -> TransmitOutcome {
        let (loss_rate, latency, brownout) = if self.active_brownout > 0 {
            self.active_brownout -= 1;
            (self.degraded_loss(), self.degraded_latency(), true)
        } else if rng.gen::<f64>() < self.brownout_chance {
            self.active_brownout =
                rng.gen_range(BROWNOUT_MIN_ATTEMPTS..=BROWNOUT_MAX_ATTEMPTS);
            (self.degraded_loss(), self.degraded_latency(), true)
        } else {
            (self.loss_rate, self.base_latency_ms, false)
        };

        let jitter = rng.gen_range(1.0 - LATENCY_JITTER..=1.0 + LATENCY_JITTER);
        let latency_ms = latency * jitter;
        let delivered = rng.gen::<f64>() >= loss_rate;

        TransmitOutcome {
            delivered,
            latency_ms,
            brownout,
        }
    }

    fn degraded_loss(&self) -> f64 {
        (self.loss_rate * self.brownout_multiplier).min(MAX_EFFECTIVE_LOSS)
    }

    fn degraded_latency(&self) -> f64 {
        self.base_latency_ms * self.brownout_multiplier
    }
}

/// 경로 집합 관리자
///
/// 시나리오의 경로 정의로 1회 생성되고 런 전체에 걸쳐 브라운아웃
/// 상태를 누적한다. 선택은 청크마다 독립적으로 재평가된다 (같은 배치
/// 안에서도 경로 상태가 변할 수 있음).
pub struct PathManager {
    paths: Vec<NetworkPath>,
    preferences: BTreeMap<Priority, Vec<String>>,
}

impl PathManager {
    /// 시나리오에서 경로 집합 생성 (경로 0개면 에러)
    pub fn from_scenario(scenario: &Scenario) -> Result<Self> {
        if scenario.paths.is_empty() {
            return Err(Error::NoPathConfigured);
        }
        Ok(Self {
            paths: scenario.paths.iter().map(NetworkPath::new).collect(),
            preferences: scenario.path_preferences.clone(),
        })
    }

    /// 경로 수
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// 인덱스로 경로 조회
    pub fn path(&self, index: usize) -> Option<&NetworkPath> {
        self.paths.get(index)
    }

    /// 인덱스 경로의 이름
    pub fn path_name(&self, index: usize) -> &str {
        self.paths.get(index).map_or("", |path| path.name())
    }

    /// 청크별 경로 선택, 설정된 경로 집합의 인덱스 반환
    ///
    /// 1. 레인에 선호 목록이 있으면: 브라운아웃이 아닌 첫 번째 이름
    ///    -> 없으면 목록에서 실재하는 첫 번째 이름 -> 둘 다 없으면 2로.
    /// 2. 레인별 비용 함수 (모두 최소화):
    ///    - P0: (지연, 손실률) 사전식
    ///    - P1: 지연*1.5 + 손실률*500
    ///    - P2: 손실률*1000 + 지연*0.5
    pub fn select_path(&self, priority: Priority) -> usize {
        if let Some(pref) = self.preferences.get(&priority) {
            let healthy = pref.iter().find_map(|name| {
                self.paths
                    .iter()
                    .position(|path| path.name() == name && !path.in_brownout())
            });
            if let Some(index) = healthy {
                return index;
            }
            let any_named = pref.iter().find_map(|name| {
                self.paths.iter().position(|path| path.name() == name)
            });
            if let Some(index) = any_named {
                return index;
            }
        }

        match priority {
            Priority::P0 => self.argmin(|a, b| {
                a.base_latency_ms
                    .total_cmp(&b.base_latency_ms)
                    .then(a.loss_rate.total_cmp(&b.loss_rate))
            }),
            Priority::P1 => self.argmin_cost(|path| {
                path.base_latency_ms * 1.5 + path.loss_rate * 500.0
            }),
            Priority::P2 => self.argmin_cost(|path| {
                path.loss_rate * 1000.0 + path.base_latency_ms * 0.5
            }),
        }
    }

    /// 선택된 경로로 전송
    pub fn transmit(&mut self, index: usize, rng: &mut impl Rng) -> TransmitOutcome {
        self.paths[index].transmit(rng)
    }

    // 동률이면 앞선 경로 유지 (첫 최소값)
    fn argmin(&self, cmp: impl Fn(&NetworkPath, &NetworkPath) -> Ordering) -> usize {
        let mut best = 0;
        for index in 1..self.paths.len() {
            if cmp(&self.paths[index], &self.paths[best]) == Ordering::Less {
                best = index;
            }
        }
        best
    }

    fn argmin_cost(&self, cost: impl Fn(&NetworkPath) -> f64) -> usize {
        self.argmin(|a, b| cost(a).total_cmp(&cost(b)))
    }
}
