//! Subject and HTML body of a payment notification.

use crate::db::Transaction;
use chrono::{DateTime, FixedOffset};

const SUBJECT_DESCRIPTION_CHARS: usize = 30;

/// Minor units to a two-decimal string: `15000` -> `"150.00"`, `-5` -> `"-0.05"`.
pub fn format_minor(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// ISO 4217 numeric code to a short label.
pub fn currency_label(code: i64) -> String {
    match code {
        980 => "UAH".to_string(),
        840 => "USD".to_string(),
        978 => "EUR".to_string(),
        985 => "PLN".to_string(),
        826 => "GBP".to_string(),
        other => other.to_string(),
    }
}

/// First `max` chars, with `...` appended when something was cut.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_local(ts: i64, offset: FixedOffset) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|t| t.with_timezone(&offset).format("%d.%m.%Y %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn offset_label(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    if secs % 3600 == 0 {
        format!("UTC{sign}{}", secs / 3600)
    } else {
        format!("UTC{sign}{}:{:02}", secs / 3600, (secs % 3600) / 60)
    }
}

pub fn subject(tx: &Transaction) -> String {
    format!(
        "New Monobank payment: {} {} - {}",
        format_minor(tx.amount),
        currency_label(tx.currency_code),
        truncate(&tx.description, SUBJECT_DESCRIPTION_CHARS)
    )
}

pub fn html_body(tx: &Transaction, client_name: &str, now: DateTime<FixedOffset>) -> String {
    let offset = *now.offset();
    let zone = offset_label(offset);
    let amount = format!(
        "{} {}",
        format_minor(tx.amount),
        currency_label(tx.currency_code)
    );
    let sender = if tx.counter_name.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div class="sender">Sender: {}</div>"#,
            escape_html(&tx.counter_name)
        )
    };
    let comment = if tx.comment.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div class="comment">Comment: {}</div>"#,
            escape_html(&tx.comment)
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<style>
  body {{ font-family: 'Helvetica Neue', Arial, sans-serif; color: #333; line-height: 1.6; background-color: #f9f9f9; }}
  .container {{ max-width: 700px; margin: 20px auto; background: #fff; border-radius: 8px; padding: 25px; }}
  h1 {{ font-size: 24px; margin-top: 0; border-bottom: 2px solid #f0f0f0; padding-bottom: 10px; }}
  .header-info {{ color: #666; font-size: 14px; margin-bottom: 20px; }}
  .transaction {{ background: #f7f9fc; border-left: 4px solid #22a9d1; border-radius: 4px; padding: 15px; }}
  .amount {{ font-size: 24px; font-weight: bold; color: #28a745; }}
  .time {{ color: #6c757d; font-size: 14px; margin-bottom: 10px; }}
  .description {{ margin: 10px 0; font-size: 16px; font-weight: 500; }}
  .details {{ margin-top: 15px; font-size: 14px; color: #666; }}
  .sender {{ background: #f0f0f0; border-radius: 3px; padding: 8px 12px; margin-top: 12px; font-style: italic; }}
  .comment {{ margin-top: 12px; padding: 8px 12px; background: #fff8e1; border-left: 2px solid #ffd54f; }}
  .id-field {{ font-family: monospace; background: #f5f5f5; padding: 3px 6px; border-radius: 3px; }}
  .footer {{ margin-top: 30px; font-size: 12px; color: #999; text-align: center; border-top: 1px solid #eee; padding-top: 15px; }}
</style>
</head>
<body>
<div class="container">
  <h1>New payment to your Monobank account</h1>
  <div class="header-info">
    <p>Client: <strong>{client}</strong></p>
    <p>Notification created: {now} ({zone})</p>
  </div>
  <div class="transaction">
    <div class="amount">{amount}</div>
    <div class="time">Operation time: {time} ({zone})</div>
    <div class="description">{description}</div>
    <div class="details">
      <span>MCC: {mcc}</span>
      <span>ID: <span class="id-field">{id}</span></span>
    </div>
    {sender}
    {comment}
  </div>
  <div class="footer">
    <p>This is an automatic message from the Monobank payment monitor.</p>
  </div>
</div>
</body>
</html>
"#,
        client = escape_html(client_name),
        now = now.format("%d.%m.%Y %H:%M"),
        zone = zone,
        amount = amount,
        time = format_local(tx.time, offset),
        description = escape_html(&tx.description),
        mcc = tx.mcc,
        id = escape_html(&tx.id),
        sender = sender,
        comment = comment,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kyiv() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn tx() -> Transaction {
        Transaction {
            id: "ZuHWzqkKGVo=".to_string(),
            account_id: "acc".to_string(),
            time: 1_700_000_000,
            description: "Переказ від Олени Коваленко на картку".to_string(),
            mcc: 4829,
            amount: 15000,
            operation_amount: 15000,
            currency_code: 980,
            balance: 100_000,
            counter_name: String::new(),
            comment: String::new(),
            created_at: String::new(),
            delivered: false,
        }
    }

    #[test]
    fn minor_units() {
        assert_eq!(format_minor(15000), "150.00");
        assert_eq!(format_minor(-500), "-5.00");
        assert_eq!(format_minor(-5), "-0.05");
        assert_eq!(format_minor(0), "0.00");
        assert_eq!(format_minor(i64::MIN), "-92233720368547758.08");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("Кава", 10), "Кава");
        assert_eq!(truncate("Кавовий напій", 4), "Каво...");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn subject_summarizes_amount_and_description() {
        assert_eq!(
            subject(&tx()),
            "New Monobank payment: 150.00 UAH - Переказ від Олени Коваленко на..."
        );
    }

    #[test]
    fn body_contains_required_fields_and_optional_blocks() {
        let now = kyiv().with_ymd_and_hms(2024, 1, 2, 3, 4, 0).unwrap();
        let mut t = tx();
        let body = html_body(&t, "Ivan", now);
        assert!(body.contains("150.00 UAH"));
        assert!(body.contains("MCC: 4829"));
        assert!(body.contains("ZuHWzqkKGVo="));
        assert!(body.contains("15.11.2023 01:13 (UTC+3)"));
        assert!(body.contains("02.01.2024 03:04"));
        assert!(!body.contains("class=\"sender\">"));
        assert!(!body.contains("class=\"comment\">"));

        t.counter_name = "Olena <K>".to_string();
        t.comment = "for coffee".to_string();
        let body = html_body(&t, "Ivan & Co", now);
        assert!(body.contains("Sender: Olena &lt;K&gt;"));
        assert!(body.contains("Comment: for coffee"));
        assert!(body.contains("Ivan &amp; Co"));
    }

    #[test]
    fn offset_labels() {
        assert_eq!(offset_label(kyiv()), "UTC+3");
        assert_eq!(offset_label(FixedOffset::west_opt(5 * 3600 + 1800).unwrap()), "UTC-5:30");
    }
}
