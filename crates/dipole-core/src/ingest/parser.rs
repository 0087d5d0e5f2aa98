use super::RawPayload;
use crate::domain::{DipoleError, DipoleResult};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// `[..]` or `[[..], ..]`
    Json,
    /// One record per line, whitespace or comma separated.
    Text,
}

impl PayloadFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "txt" | "dat" | "csv" => Some(Self::Text),
            _ => None,
        }
    }
}

pub fn read_payload(path: &Path) -> DipoleResult<RawPayload> {
    let format = PayloadFormat::from_path(path).ok_or_else(|| {
        DipoleError::deserialization(format!(
            "unsupported payload file '{}'; expected .json, .txt, .dat or .csv",
            path.display()
        ))
    })?;
    let source = fs::read_to_string(path).map_err(|source| {
        DipoleError::deserialization(format!(
            "failed to read payload '{}': {}",
            path.display(),
            source
        ))
    })?;
    decode_payload(&source, format)
}

pub fn decode_payload(source: &str, format: PayloadFormat) -> DipoleResult<RawPayload> {
    match format {
        PayloadFormat::Json => decode_json(source),
        PayloadFormat::Text => decode_text(source),
    }
}

fn decode_json(source: &str) -> DipoleResult<RawPayload> {
    serde_json::from_str(source).map_err(|error| {
        DipoleError::deserialization(format!(
            "expected a 1-D or 2-D JSON array of numbers: {}",
            error
        ))
    })
}

fn decode_text(source: &str) -> DipoleResult<RawPayload> {
    let mut rows = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let normalized = strip_inline_comment(line).trim();
        if normalized.is_empty() {
            continue;
        }
        rows.push(parse_text_row(index + 1, normalized)?);
    }

    match rows.len() {
        0 => Err(DipoleError::deserialization(
            "text payload contains no numeric rows",
        )),
        1 => Ok(RawPayload::Vector(rows.remove(0))),
        _ => Ok(RawPayload::Matrix(rows)),
    }
}

fn parse_text_row(source_line: usize, line: &str) -> DipoleResult<Vec<f64>> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(column, token)| {
            parse_number(token).ok_or_else(|| {
                DipoleError::deserialization(format!(
                    "line {}, column {}: '{}' is not a number",
                    source_line,
                    column + 1,
                    token
                ))
            })
        })
        .collect()
}

fn parse_number(token: &str) -> Option<f64> {
    token
        .parse::<f64>()
        .ok()
        .or_else(|| token.replace(['d', 'D'], "e").parse::<f64>().ok())
}

fn strip_inline_comment(line: &str) -> &str {
    match line.find(['#', '!']) {
        Some(index) => &line[..index],
        None => line,
    }
}
