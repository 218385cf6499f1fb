//! 페이로드 적재 유틸리티
//!
//! 코어 밖의 협력자 영역: 파일에서 페이로드를 읽어 목표 크기로
//! 반복/절단하거나, 파일이 없으면 결정적 샘플 텍스트를 생성한다.

use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// 테스트/데모용 샘플 페이로드 생성 (결정적)
pub fn generate_sample_payload(target_bytes: usize) -> Vec<u8> {
    let patterns = [
        "The quick brown fox jumps over the lazy dog. ",
        "Priority lanes keep strategy files ahead of bulk media. ",
        "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ",
        "가나다라마바사아자차카타파하 ",
        "Weighted fair queuing meets earliest deadline first. ",
    ];

    let mut data = Vec::with_capacity(target_bytes);
    let mut line_num = 0u64;
    while data.len() < target_bytes {
        let line = format!(
            "[{:08}] {}\n",
            line_num,
            patterns[line_num as usize % patterns.len()]
        );
        data.extend_from_slice(line.as_bytes());
        line_num += 1;
    }
    data.truncate(target_bytes);
    data
}

/// 페이로드 적재
///
/// path가 있으면 파일을 읽고, 없으면 샘플을 생성한다. 어느 쪽이든
/// 반복 + 절단으로 정확히 target_bytes 크기를 만든다.
pub fn load_payload(path: Option<&Path>, target_bytes: usize) -> Result<Vec<u8>> {
    if target_bytes == 0 {
        return Err(Error::EmptyPayload);
    }

    let data = match path {
        Some(path) => {
            let data = fs::read(path)?;
            if data.is_empty() {
                return Err(Error::EmptyPayload);
            }
            data
        }
        None => return Ok(generate_sample_payload(target_bytes)),
    };

    if data.len() >= target_bytes {
        return Ok(data[..target_bytes].to_vec());
    }

    let repeats = (target_bytes + data.len() - 1) / data.len();
    let mut expanded = Vec::with_capacity(repeats * data.len());
    for _ in 0..repeats {
        expanded.extend_from_slice(&data);
    }
    expanded.truncate(target_bytes);
    Ok(expanded)
}
