//! PTS 시뮬레이터 CLI - Priority Transfer Scheduler
//!
//! 우선순위 레인 기반 전송 스케줄링 시뮬레이터 실행기
//! - 시나리오별 레인/경로 파라미터 (motorsport / mobility / manufacturing)
//! - 시드 고정으로 결정적 재현 가능
//!
//! 사용법:
//!   cargo run --release --bin pts-sim -- [OPTIONS]
//!
//! 예시:
//!   # 기본 시나리오 실행
//!   cargo run --release --bin pts-sim -- --scenario motorsport
//!
//!   # 시드 고정 + 상세 이벤트 출력
//!   cargo run --release --bin pts-sim -- -c mobility --seed 42 --verbose

use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pts::{payload, Priority, Scenario, Simulator};

/// CLI 설정
struct SimArgs {
    scenario: String,
    payload: Option<PathBuf>,
    priority: Option<Priority>,
    size_mb: Option<f64>,
    seed: Option<u64>,
    verbose: bool,
}

impl Default for SimArgs {
    fn default() -> Self {
        Self {
            scenario: "motorsport".to_string(),
            payload: None,
            priority: None,
            size_mb: None,
            seed: None,
            verbose: false,
        }
    }
}

fn parse_args() -> SimArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = SimArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--scenario" | "-c" => {
                if i + 1 < args.len() {
                    parsed.scenario = args[i + 1].clone();
                    i += 1;
                }
            }
            "--payload" | "-p" => {
                if i + 1 < args.len() {
                    parsed.payload = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--priority" => {
                if i + 1 < args.len() {
                    parsed.priority =
                        Some(args[i + 1].parse().expect("유효한 우선순위 필요 (P0/P1/P2)"));
                    i += 1;
                }
            }
            "--size-mb" => {
                if i + 1 < args.len() {
                    parsed.size_mb = Some(args[i + 1].parse().expect("유효한 숫자 필요"));
                    i += 1;
                }
            }
            "--seed" => {
                if i + 1 < args.len() {
                    parsed.seed = Some(args[i + 1].parse().expect("유효한 시드 필요"));
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                parsed.verbose = true;
            }
            "--help" | "-h" => {
                println!(
                    r#"PTS Simulator - Priority Transfer Scheduler

WFQ+EDF 혼합 스케줄링 + 멀티패스 손실 모델 + FEC 복구 계정 시뮬레이터

사용법:
  cargo run --release --bin pts-sim -- [OPTIONS]

옵션:
  -c, --scenario <NAME>  시나리오 선택 (기본: motorsport)
                         사용 가능: manufacturing, mobility, motorsport
  -p, --payload <PATH>   페이로드 파일 경로 (기본: 내장 샘플 생성)
  --priority <LANE>      우선순위 레인 P0/P1/P2 (기본: 시나리오 기본값)
  --size-mb <MB>         페이로드 크기 (MiB, 기본: 시나리오 기본값)
  --seed <N>             RNG 시드 (재현 가능한 데모용)
  -v, --verbose          청크별 전송 이벤트 출력
  -h, --help             이 도움말 출력

예시:
  # 모빌리티 시나리오, P1 레인, 시드 고정
  cargo run --release --bin pts-sim -- -c mobility --priority P1 --seed 7

  # 파일 페이로드 4MiB + 상세 출력
  cargo run --release --bin pts-sim -- -p data.bin --size-mb 4 -v
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    parsed
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args();

    let scenario = Scenario::by_name(&args.scenario)?;
    let priority = args.priority.unwrap_or(scenario.default_priority);
    let lane = scenario.priority_config(priority)?.clone();
    let size_mb = args.size_mb.unwrap_or(scenario.default_payload_mb);
    let target_bytes = (size_mb * 1024.0 * 1024.0) as usize;

    let data = payload::load_payload(args.payload.as_deref(), target_bytes)?;

    println!("=== PTS Simulator / {} ===", scenario.label);
    println!("{}", scenario.description);
    println!("Available paths:");
    for path in &scenario.paths {
        println!("  - {} ({})", path.name, path.description);
    }
    println!();
    println!("Priority lane: {} ({}) - {}", priority, lane.label, lane.description);
    println!(
        "Payload: {:.2} MiB, chunk size {} bytes, FEC ({}, {})",
        data.len() as f64 / (1024.0 * 1024.0),
        lane.chunk_size,
        lane.fec.0,
        lane.fec.1,
    );
    println!();

    let simulator = Simulator::new(scenario.clone(), priority, &data, args.seed)?;
    let report = simulator.run();

    if args.verbose {
        for event in &report.events {
            let label = if event.is_parity { "Parity" } else { "Chunk" };
            let status = if event.brownout_active {
                "brownout"
            } else if event.delivered {
                "ok"
            } else {
                "loss"
            };
            let verdict = if event.delivered { "delivered in" } else { "LOST after" };
            println!(
                "  [Path {}] {} {} {} {:5.1} ms (hash {}..., {})",
                event.path_name, label, event.chunk_id, verdict, event.latency_ms,
                event.fingerprint_prefix, status,
            );
        }
        println!();
    }

    let summary = &report.summary;
    println!(
        "Summary: delivered {}/{} data chunks",
        summary.delivered_data, summary.total_data_chunks
    );
    println!(
        "Parity delivered: {}, lost: {}",
        summary.delivered_parity, summary.lost_parity
    );
    println!(
        "Recovered via FEC: {}, unrecovered losses: {}",
        summary.recovered_via_fec, summary.unrecovered
    );
    println!("Total simulated time: {:.2}s", summary.elapsed_s);
    println!(
        "Effective success ratio: {:.1}%",
        summary.success_ratio * 100.0
    );
    if summary.passed {
        println!("Result: SLA met, all critical data reconstructed");
        println!("{}", scenario.narrative.pass);
    } else {
        println!("Result: SLA breached, consider boosting parity or rerouting");
        println!("{}", scenario.narrative.fail);
    }

    Ok(())
}
