use colored::Colorize;

use crate::editor::Notifier;
use crate::records::account::{
    CategoryTotal, DashboardDetails, MonthlyCashflow, SubscriptionPlan, TopProduct, UserProfile,
};
use crate::records::{FieldValue, Record, RecordKind};
use crate::view::RenderedPage;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" | "table" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Prints notifications as `[OK]` / `[ERR]` lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn success(&self, message: &str) {
        println!(
            "{}{}{} {}",
            "[".bold().white(),
            "OK".bold().green(),
            "]".bold().white(),
            message
        );
    }

    fn error(&self, message: &str) {
        eprintln!(
            "{}{}{} {}",
            "[".bold().white(),
            "ERR".bold().red(),
            "]".bold().white(),
            message
        );
    }
}

pub fn format_kv_line(label: &str, value: &str) -> String {
    format!(":: {:<14}: {}", label, value)
}

fn cell<R: Record>(record: &R, column: &str) -> String {
    record
        .field(column)
        .unwrap_or(FieldValue::Missing)
        .display_text()
}

/// Fixed-width table of the visible rows. Padding rows are drawn blank so a
/// short last page keeps the height of a full one.
pub fn render_table<R: Record>(kind: RecordKind, page: &RenderedPage<R>) -> String {
    let columns = kind.columns();
    let cells: Vec<Vec<String>> = page
        .rows
        .iter()
        .map(|r| columns.iter().map(|c| cell(r, c)).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c, w = *w))
        .collect();
    out.push_str(&header.join("  ").bold().to_string());
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<w$}", v, w = *w))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    for _ in 0..page.padding {
        out.push('\n');
    }
    if page.rows.is_empty() && page.padding == 0 {
        out.push_str(&format!("(no {} records)\n", kind.label()));
    }
    out.push_str(&format!(
        "page {}/{} :: {} matched\n",
        page.page + 1,
        page.page_count,
        page.matched
    ));
    out
}

pub fn render_json<T: serde::Serialize + ?Sized>(value: &T) -> Vec<u8> {
    serde_json::to_vec_pretty(value).unwrap_or_else(|_| b"[]\n".to_vec())
}

fn money(currency: Option<&str>, value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}{}", currency.unwrap_or(""), FieldValue::Number(v).display_text()),
        None => "-".to_string(),
    }
}

pub fn render_dashboard(details: &DashboardDetails, cashflow: &[MonthlyCashflow]) -> String {
    let currency = details.currency.as_deref();
    let mut lines = vec![
        format_kv_line("Income", &money(currency, details.income)),
        format_kv_line("Expense", &money(currency, details.expense)),
        format_kv_line("Profit", &money(currency, details.profit)),
        format_kv_line("Cash flow", &money(currency, details.cash_flow)),
        format_kv_line(
            "Products sold",
            &details
                .products_sold
                .map(|v| FieldValue::Number(v).display_text())
                .unwrap_or_else(|| "-".to_string()),
        ),
    ];
    if !cashflow.is_empty() {
        lines.push(String::new());
        lines.push(format!("{:<5} {:>12} {:>12} {:>12}", "month", "income", "expense", "net"));
        for entry in cashflow {
            lines.push(format!(
                "{:<5} {:>12.2} {:>12.2} {:>12.2}",
                entry.month_name(),
                entry.income,
                entry.expense,
                entry.net()
            ));
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Category totals for one window, largest first, with each share of the total.
pub fn render_expense_breakdown(period: &str, totals: &[CategoryTotal]) -> String {
    let mut out = format!("expenses :: {}\n", period.replace('_', " "));
    if totals.is_empty() {
        out.push_str("(no expenses recorded)\n");
        return out;
    }
    let mut sorted: Vec<&CategoryTotal> = totals.iter().collect();
    sorted.sort_by(|a, b| b.amount().total_cmp(&a.amount()));
    let sum: f64 = sorted.iter().map(|t| t.amount()).sum();
    for total in sorted {
        let share = if sum > 0.0 {
            total.amount() / sum * 100.0
        } else {
            0.0
        };
        out.push_str(&format_kv_line(
            &total.category,
            &format!("{:.2} ({share:.0}%)", total.amount()),
        ));
        out.push('\n');
    }
    out
}

pub fn render_top_products(products: &[TopProduct]) -> String {
    if products.is_empty() {
        return "(no sales yet)\n".to_string();
    }
    let mut out = format!(
        "{:<24} {:>8} {:>10} {:>12}\n",
        "product", "sold", "stock", "sales"
    );
    for product in products {
        let number = |v: Option<f64>| {
            v.map(|n| FieldValue::Number(n).display_text())
                .unwrap_or_else(|| "-".to_string())
        };
        out.push_str(&format!(
            "{:<24} {:>8} {:>10} {:>12}\n",
            product.name,
            number(product.quantity_sold),
            product.stock_level().map(|l| l.label()).unwrap_or("-"),
            number(product.total)
        ));
    }
    out
}

pub fn render_profile(profile: &UserProfile) -> String {
    let fields = [
        ("Email", profile.email.as_deref()),
        ("Name", profile.name.as_deref()),
        ("Display name", profile.display_name.as_deref()),
        ("Business", profile.business_type.as_deref()),
        ("Location", profile.location.as_deref()),
        ("Mobile", profile.mobile_number.as_deref()),
        ("Address", profile.address.as_deref()),
    ];
    let mut out = String::new();
    for (label, value) in fields {
        out.push_str(&format_kv_line(label, value.unwrap_or("-")));
        out.push('\n');
    }
    out
}

pub fn render_plans(plans: &[SubscriptionPlan]) -> String {
    let mut out = String::new();
    for plan in plans {
        out.push_str(&format_kv_line(
            &plan.plan,
            &FieldValue::Number(plan.price).display_text(),
        ));
        out.push('\n');
    }
    if plans.is_empty() {
        out.push_str("(no plans available)\n");
    }
    out
}
