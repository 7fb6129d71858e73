use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};

use crate::error::RegistryError;

/// 첨부 파일 최대 크기 (100MB)
pub const MAX_ATTACHMENT_SIZE: u64 = 100 * 1024 * 1024;

/// DB 에 저장하는 타임스탬프 형식
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 첨부 원본 파일 검증
/// - canonicalize()로 경로 정규화 후, 일반 파일인지와 크기를 확인합니다.
pub fn validate_source_file(path: &Path) -> Result<PathBuf, RegistryError> {
    if path.as_os_str().is_empty() {
        return Err(RegistryError::validation("No attachment selected"));
    }

    let canonical_path = path.canonicalize().map_err(|e| {
        RegistryError::validation(format!("Attachment not readable ({}): {}", path.display(), e))
    })?;

    let metadata = fs::metadata(&canonical_path)?;
    if !metadata.is_file() {
        return Err(RegistryError::validation(format!(
            "Attachment is not a file: {}",
            canonical_path.display()
        )));
    }

    let size = metadata.len();
    if size > MAX_ATTACHMENT_SIZE {
        return Err(RegistryError::validation(format!(
            "Attachment too large: {}MB (max {}MB)",
            size / (1024 * 1024),
            MAX_ATTACHMENT_SIZE / (1024 * 1024)
        )));
    }

    Ok(canonical_path)
}

/// 현재 사용자 이름 (Windows: USERNAME, 그 외 USER, 없으면 빈 문자열)
pub fn current_username() -> String {
    std::env::var("USERNAME")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_default()
        .trim()
        .to_string()
}

pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

pub fn current_year() -> i32 {
    Local::now().year()
}

/// 계약 폴더 이름: 파일 시스템 안전 + 고유 (`<번호>_<id>`)
pub fn contract_folder_name(contract_number: &str, contract_id: i64) -> String {
    const BAD: &str = "\\/:*?\"<>|";
    let clean: String = contract_number
        .trim()
        .chars()
        .map(|c| if BAD.contains(c) { '_' } else { c })
        .collect();
    let clean = clean.trim_matches(|c| c == ' ' || c == '.' || c == '_');
    let clean = if clean.is_empty() { "contract" } else { clean };
    format!("{}_{}", clean, contract_id)
}

/// 금액 입력 파싱: 공백 제거, 소수점은 버림. 비어 있거나 숫자가 아니면 None
pub fn parse_amount(text: &str) -> Option<i64> {
    let s: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return None;
    }
    if s.contains('.') {
        s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.trunc() as i64)
    } else {
        s.parse::<i64>().ok()
    }
}

/// 천 단위 공백 구분: 1234567 -> "1 234 567"
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// 포린트 금액 표시: "12 345 Ft"
pub fn format_huf(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    format!("{}{} Ft", sign, group_thousands(amount.unsigned_abs()))
}

/// 부호 있는 차액 표시: "+500 Ft", "-1 000 Ft"
pub fn format_signed_huf(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "+" };
    format!("{}{} Ft", sign, group_thousands(amount.unsigned_abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_contract_folder_name() {
        assert_eq!(contract_folder_name("SZ-001", 7), "SZ-001_7");
        assert_eq!(contract_folder_name("SZ/2024:01", 3), "SZ_2024_01_3");
        assert_eq!(contract_folder_name("  ..  ", 9), "contract_9");
        assert_eq!(contract_folder_name("", 1), "contract_1");
        assert_eq!(contract_folder_name("a?b.", 2), "a_b_2");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12 000"), Some(12000));
        assert_eq!(parse_amount("1500.9"), Some(1500));
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("-250"), Some(-250));
    }

    #[test]
    fn test_format_huf() {
        assert_eq!(format_huf(0), "0 Ft");
        assert_eq!(format_huf(999), "999 Ft");
        assert_eq!(format_huf(1234567), "1 234 567 Ft");
        assert_eq!(format_huf(-1000), "-1 000 Ft");
        assert_eq!(format_signed_huf(500), "+500 Ft");
        assert_eq!(format_signed_huf(-10000), "-10 000 Ft");
    }

    #[test]
    fn test_validate_source_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("doc.pdf");
        std::fs::write(&file, b"%PDF").unwrap();

        assert!(validate_source_file(&file).is_ok());
        assert!(matches!(
            validate_source_file(&dir.path().join("missing.pdf")),
            Err(RegistryError::Validation(_))
        ));
        assert!(matches!(
            validate_source_file(dir.path()),
            Err(RegistryError::Validation(_))
        ));
        assert!(matches!(
            validate_source_file(Path::new("")),
            Err(RegistryError::Validation(_))
        ));
    }
}
