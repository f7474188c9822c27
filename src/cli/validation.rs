use crate::cli::args::{CliArgs, Command};
use crate::output::OutputFormat;
use crate::records::account::EXPENSE_PERIODS;
use crate::records::RecordKind;
use crate::view::page::PageSize;

pub fn parse_kind(raw: &str) -> Result<RecordKind, String> {
    RecordKind::parse(raw).ok_or_else(|| {
        format!("invalid record kind '{raw}', expected products, sales, deliveries, transactions or expenses")
    })
}

pub fn parse_page_size(raw: &str) -> Result<PageSize, String> {
    PageSize::parse(raw)
        .ok_or_else(|| format!("invalid --page-size '{raw}', expected 5, 10, 25 or all"))
}

pub fn parse_format(raw: &str) -> Result<OutputFormat, String> {
    OutputFormat::parse(raw).ok_or_else(|| format!("invalid --format '{raw}', expected text or json"))
}

fn check_json(raw: &str) -> Result<(), String> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| format!("invalid --json payload: {e}"))?;
    if !value.is_object() {
        return Err("invalid --json payload: expected a JSON object".to_string());
    }
    Ok(())
}

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }

    match &args.command {
        Command::List(list) => {
            parse_kind(&list.kind)?;
            if let Some(raw) = list.page_size.as_deref() {
                parse_page_size(raw)?;
            }
            if let Some(raw) = list.format.as_deref() {
                parse_format(raw)?;
            }
            if list.page == Some(0) {
                return Err("invalid --page, pages start at 1".to_string());
            }
        }
        Command::Add { kind, json } | Command::Update { kind, json, .. } => {
            parse_kind(kind)?;
            check_json(json)?;
        }
        Command::Delete { kind, .. } => {
            parse_kind(kind)?;
        }
        Command::Dashboard { year, period } => {
            if let Some(year) = year {
                if !(1970..=9999).contains(year) {
                    return Err(format!("invalid --year '{year}'"));
                }
            }
            if !EXPENSE_PERIODS.contains(&period.as_str()) {
                return Err(format!(
                    "invalid --period '{period}', expected {}",
                    EXPENSE_PERIODS.join(", ")
                ));
            }
        }
        Command::Upgrade {
            reference, failed, ..
        } => {
            if reference.is_none() && failed.is_none() {
                return Err("upgrade needs --reference or --failed".to_string());
            }
        }
        _ => {}
    }
    Ok(())
}
