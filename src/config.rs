//! 시나리오 설정
//!
//! 우선순위 레인 / 네트워크 경로 파라미터를 타입화된 불변 레코드로
//! 정의한다. 런 시작 전에 1회 구성하고 런 동안 변경하지 않는다.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chunk::{self, Chunk, Priority};
use crate::{Error, Result};

/// 우선순위 레인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConfig {
    /// 표시용 라벨
    pub label: String,

    /// 레인 설명
    pub description: String,

    /// 청크 크기 (바이트)
    pub chunk_size: usize,

    /// 마감시간 (초)
    pub deadline: f64,

    /// FEC 파라미터 (n, k): 그룹당 데이터 k개 + 패리티 n-k개
    pub fec: (usize, usize),

    /// WFQ 가중치
    pub weight: u32,
}

/// 네트워크 경로 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    /// 경로 이름
    pub name: String,

    /// 경로 설명
    pub description: String,

    /// 기준 지연 (밀리초)
    pub base_latency_ms: f64,

    /// 기준 손실률 (0.0 ~ 1.0)
    pub loss_rate: f64,

    /// 브라운아웃 진입 확률 (시도당)
    pub brownout_chance: f64,

    /// 브라운아웃 중 지연/손실 배수
    pub brownout_multiplier: f64,
}

/// 합격/불합격 내러티브 문자열
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narrative {
    /// unrecovered == 0일 때 출력
    pub pass: String,

    /// 그 외 출력
    pub fail: String,
}

/// 시뮬레이션 시나리오
///
/// 런 전체에 대해 불변인 설정 집합. 순회 순서가 출력에 영향을 주는
/// 컬렉션은 전부 BTreeMap으로 고정한다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// 시나리오 이름 (CLI 선택용)
    pub name: String,

    /// 표시용 라벨
    pub label: String,

    /// 시나리오 설명
    pub description: String,

    /// 기본 우선순위 레인
    pub default_priority: Priority,

    /// 기본 페이로드 크기 (MiB)
    pub default_payload_mb: f64,

    /// 우선순위별 레인 설정
    pub priorities: BTreeMap<Priority, PriorityConfig>,

    /// 백그라운드 트래픽 행렬: 주 레인 -> (다른 레인 -> 청크 수)
    pub background_traffic: BTreeMap<Priority, BTreeMap<Priority, usize>>,

    /// 경로 정의 목록
    pub paths: Vec<PathConfig>,

    /// 우선순위별 경로 선호 목록 (선택)
    pub path_preferences: BTreeMap<Priority, Vec<String>>,

    /// 결과 내러티브
    pub narrative: Narrative,
}

impl Scenario {
    /// 모터스포츠: 서킷에서 본사로 전략 파일 / 텔레메트리 / 영상 전송
    pub fn motorsport() -> Self {
        let mut priorities = BTreeMap::new();
        priorities.insert(
            Priority::P0,
            PriorityConfig {
                label: "P0 - Strategy Delta".into(),
                description: "Race strategy files and control commands".into(),
                chunk_size: 32 * 1024,
                deadline: 2.0,
                fec: (16, 11),
                weight: 8,
            },
        );
        priorities.insert(
            Priority::P1,
            PriorityConfig {
                label: "P1 - Engineering Feeds".into(),
                description: "High-rate telemetry for factory analysts".into(),
                chunk_size: 128 * 1024,
                deadline: 8.0,
                fec: (20, 16),
                weight: 3,
            },
        );
        priorities.insert(
            Priority::P2,
            PriorityConfig {
                label: "P2 - Media + Archives".into(),
                description: "Bulk onboard footage and sensor backlogs".into(),
                chunk_size: 512 * 1024,
                deadline: 30.0,
                fec: (20, 18),
                weight: 1,
            },
        );

        Self {
            name: "motorsport".into(),
            label: "Motorsport - Trackside to Factory".into(),
            description: "Pit wall strategy, telemetry and bulk video pushed over \
                          fickle 5G and satellite links."
                .into(),
            default_priority: Priority::P0,
            default_payload_mb: 2.0,
            priorities,
            background_traffic: background_matrix(&[
                (Priority::P0, &[(Priority::P1, 2), (Priority::P2, 2)]),
                (Priority::P1, &[(Priority::P0, 1), (Priority::P2, 2)]),
                (Priority::P2, &[(Priority::P1, 3)]),
            ]),
            paths: vec![
                PathConfig {
                    name: "Trackside 5G".into(),
                    description: "Private mmWave slicing inside the paddock".into(),
                    base_latency_ms: 55.0,
                    loss_rate: 0.08,
                    brownout_chance: 0.04,
                    brownout_multiplier: 2.4,
                },
                PathConfig {
                    name: "Low-Earth Orbit".into(),
                    description: "LEO backhaul when cellular drops off".into(),
                    base_latency_ms: 540.0,
                    loss_rate: 0.02,
                    brownout_chance: 0.01,
                    brownout_multiplier: 1.6,
                },
            ],
            path_preferences: BTreeMap::new(),
            narrative: Narrative {
                pass: "Race control receives every delta before the pit wall freeze."
                    .into(),
                fail: "Escalate to the trackside strategist: a strategy delta missed \
                       its window."
                    .into(),
            },
        }
    }

    /// 도심 모빌리티: 자율주행 플릿 OTA / 텔레메트리 / HD 맵 배포
    pub fn mobility() -> Self {
        let mut priorities = BTreeMap::new();
        priorities.insert(
            Priority::P0,
            PriorityConfig {
                label: "P0 - Safety Kernel Patch".into(),
                description: "Safety-critical control patches for the fleet".into(),
                chunk_size: 32 * 1024,
                deadline: 1.5,
                fec: (16, 11),
                weight: 9,
            },
        );
        priorities.insert(
            Priority::P1,
            PriorityConfig {
                label: "P1 - Live Fleet Telemetry".into(),
                description: "Perception telemetry for the edge orchestrator".into(),
                chunk_size: 96 * 1024,
                deadline: 5.0,
                fec: (18, 14),
                weight: 3,
            },
        );
        priorities.insert(
            Priority::P2,
            PriorityConfig {
                label: "P2 - HD Map + Media".into(),
                description: "City-scale HD map refreshes and cabin content".into(),
                chunk_size: 384 * 1024,
                deadline: 25.0,
                fec: (20, 18),
                weight: 1,
            },
        );

        Self {
            name: "mobility".into(),
            label: "Urban Mobility - Autonomous Fleet Ops".into(),
            description: "Calibration bundles, live telemetry and HD map refreshes \
                          across a robo-taxi fleet."
                .into(),
            default_priority: Priority::P0,
            default_payload_mb: 1.5,
            priorities,
            background_traffic: background_matrix(&[
                (Priority::P0, &[(Priority::P1, 3), (Priority::P2, 1)]),
                (Priority::P1, &[(Priority::P2, 3)]),
                (Priority::P2, &[(Priority::P1, 2)]),
            ]),
            paths: vec![
                PathConfig {
                    name: "C-V2X 5G".into(),
                    description: "City-operated cellular V2X slicing".into(),
                    base_latency_ms: 40.0,
                    loss_rate: 0.06,
                    brownout_chance: 0.05,
                    brownout_multiplier: 2.0,
                },
                PathConfig {
                    name: "Edge Mesh".into(),
                    description: "Municipal mesh relays on street furniture".into(),
                    base_latency_ms: 120.0,
                    loss_rate: 0.04,
                    brownout_chance: 0.02,
                    brownout_multiplier: 1.8,
                },
                PathConfig {
                    name: "Satellite Backhaul".into(),
                    description: "Always-on LEO fallback across the metro".into(),
                    base_latency_ms: 620.0,
                    loss_rate: 0.015,
                    brownout_chance: 0.008,
                    brownout_multiplier: 1.5,
                },
            ],
            path_preferences: preference_map(&[
                (Priority::P0, &["C-V2X 5G", "Satellite Backhaul"]),
                (Priority::P1, &["C-V2X 5G", "Edge Mesh"]),
                (Priority::P2, &["Edge Mesh", "Satellite Backhaul"]),
            ]),
            narrative: Narrative {
                pass: "Fleet orchestration green-lit: every vehicle gets the safety \
                       kernel within SLA."
                    .into(),
                fail: "Trigger depot fallback mode: at least one pod missed its \
                       control update window."
                    .into(),
            },
        }
    }

    /// 스마트 제조: 기가팩토리 OT망 안전 패치 / 텔레메트리 / 감사 기록
    pub fn manufacturing() -> Self {
        let mut priorities = BTreeMap::new();
        priorities.insert(
            Priority::P0,
            PriorityConfig {
                label: "P0 - Safety Interlocks".into(),
                description: "Robot safety interlocks and shutdown commands".into(),
                chunk_size: 48 * 1024,
                deadline: 1.8,
                fec: (18, 13),
                weight: 8,
            },
        );
        priorities.insert(
            Priority::P1,
            PriorityConfig {
                label: "P1 - Machine Telemetry".into(),
                description: "Predictive maintenance and energy feeds".into(),
                chunk_size: 160 * 1024,
                deadline: 6.0,
                fec: (20, 15),
                weight: 3,
            },
        );
        priorities.insert(
            Priority::P2,
            PriorityConfig {
                label: "P2 - Sustainability Ledger".into(),
                description: "ESG ledgers, QA video and provenance records".into(),
                chunk_size: 512 * 1024,
                deadline: 45.0,
                fec: (22, 18),
                weight: 2,
            },
        );

        Self {
            name: "manufacturing".into(),
            label: "Smart Manufacturing - Gigafactory Ops".into(),
            description: "Robotics safety patches, machine telemetry and audit \
                          records across wired and wireless OT networks."
                .into(),
            default_priority: Priority::P0,
            default_payload_mb: 2.5,
            priorities,
            background_traffic: background_matrix(&[
                (Priority::P0, &[(Priority::P1, 2), (Priority::P2, 1)]),
                (Priority::P1, &[(Priority::P0, 1), (Priority::P2, 2)]),
                (Priority::P2, &[(Priority::P1, 2)]),
            ]),
            paths: vec![
                PathConfig {
                    name: "Industrial 5G".into(),
                    description: "Private 5G slicing across the floor".into(),
                    base_latency_ms: 35.0,
                    loss_rate: 0.05,
                    brownout_chance: 0.03,
                    brownout_multiplier: 1.9,
                },
                PathConfig {
                    name: "Fiber Backbone".into(),
                    description: "Deterministic TSN fiber to the control room".into(),
                    base_latency_ms: 18.0,
                    loss_rate: 0.01,
                    brownout_chance: 0.005,
                    brownout_multiplier: 1.2,
                },
                PathConfig {
                    name: "LoRa Supervisory".into(),
                    description: "Low-bandwidth supervisory network".into(),
                    base_latency_ms: 480.0,
                    loss_rate: 0.03,
                    brownout_chance: 0.015,
                    brownout_multiplier: 1.4,
                },
            ],
            path_preferences: preference_map(&[
                (Priority::P0, &["Fiber Backbone", "Industrial 5G"]),
                (Priority::P1, &["Industrial 5G", "Fiber Backbone"]),
                (Priority::P2, &["LoRa Supervisory", "Fiber Backbone"]),
            ]),
            narrative: Narrative {
                pass: "Digital twin stays green: all safety interlocks landed before \
                       the robotics cycle reset."
                    .into(),
                fail: "Alert the OT engineer: resend interlocks or route through the \
                       deterministic fiber segment."
                    .into(),
            },
        }
    }

    /// 내장 시나리오 이름 목록
    pub fn names() -> &'static [&'static str] {
        &["manufacturing", "mobility", "motorsport"]
    }

    /// 이름으로 시나리오 조회
    pub fn by_name(name: &str) -> Result<Self> {
        match name {
            "motorsport" => Ok(Self::motorsport()),
            "mobility" => Ok(Self::mobility()),
            "manufacturing" => Ok(Self::manufacturing()),
            _ => Err(Error::UnknownScenario {
                name: name.to_string(),
            }),
        }
    }

    /// 런 시작 전 검증: 경로 1개 이상 + 레인별 FEC/청크 크기 유효
    pub fn validate(&self) -> Result<()> {
        if self.paths.is_empty() {
            return Err(Error::NoPathConfigured);
        }
        for config in self.priorities.values() {
            let (n, k) = config.fec;
            if k == 0 || n <= k {
                return Err(Error::InvalidFecParams { n, k });
            }
            if config.chunk_size == 0 {
                return Err(Error::InvalidChunkSize {
                    size: config.chunk_size,
                });
            }
        }
        Ok(())
    }

    /// 우선순위 레인 설정 조회
    pub fn priority_config(&self, priority: Priority) -> Result<&PriorityConfig> {
        self.priorities
            .get(&priority)
            .ok_or_else(|| Error::PriorityNotConfigured {
                scenario: self.name.clone(),
                priority: priority.to_string(),
            })
    }

    /// 우선순위별 WFQ 가중치 맵
    pub fn weights(&self) -> BTreeMap<Priority, u32> {
        self.priorities
            .iter()
            .map(|(&priority, config)| (priority, config.weight))
            .collect()
    }

    /// 백그라운드 트래픽 청크 생성
    ///
    /// 주 레인의 행렬 항목을 레인 오름차순으로 순회한다 (결정적).
    /// 대상 레인 설정이 없는 항목은 건너뛴다.
    pub fn background_chunks(&self, primary: Priority, rng: &mut impl Rng) -> Vec<Chunk> {
        let mut out = Vec::new();
        let Some(matrix) = self.background_traffic.get(&primary) else {
            return out;
        };
        for (&priority, &count) in matrix {
            let Some(config) = self.priorities.get(&priority) else {
                continue;
            };
            for _ in 0..count {
                out.push(chunk::background_chunk(
                    priority,
                    config.chunk_size,
                    config.deadline,
                    rng,
                ));
            }
        }
        out
    }
}

fn background_matrix(
    entries: &[(Priority, &[(Priority, usize)])],
) -> BTreeMap<Priority, BTreeMap<Priority, usize>> {
    entries
        .iter()
        .map(|(primary, targets)| (*primary, targets.iter().copied().collect()))
        .collect()
}

fn preference_map(entries: &[(Priority, &[&str])]) -> BTreeMap<Priority, Vec<String>> {
    entries
        .iter()
        .map(|(priority, names)| {
            (
                *priority,
                names.iter().map(|name| name.to_string()).collect(),
            )
        })
        .collect()
}
