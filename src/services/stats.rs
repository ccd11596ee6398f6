// src/services/stats.rs
//
// O motor de agregação: os baldes de fatura, o resumo do regime
// forfettario e os auxiliares de formatação it-IT usados pelo contexto do
// chatbot e pelo export.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::Value;

use crate::models::invoice::{
    ForfettarioSummary, Invoice, InvoiceStats, MonthlyAmount, FORFETTARIO_LIMIT,
    STATUS_ISSUED, STATUS_LEGACY_UNPAID, STATUS_PAID, STATUS_TO_ISSUE,
};

pub const MONTHS_IT: [&str; 12] = [
    "Gennaio",
    "Febbraio",
    "Marzo",
    "Aprile",
    "Maggio",
    "Giugno",
    "Luglio",
    "Agosto",
    "Settembre",
    "Ottobre",
    "Novembre",
    "Dicembre",
];

// Colunas do export CSV, na ordem que o cliente espera.
pub const CONTACT_CSV_COLUMNS: [&str; 8] =
    ["id", "name", "company", "email", "phone", "value", "status", "lastContact"];
pub const OPPORTUNITY_CSV_COLUMNS: [&str; 8] =
    ["id", "title", "company", "value", "stage", "probability", "closeDate", "owner"];
pub const TASK_CSV_COLUMNS: [&str; 7] =
    ["id", "title", "type", "priority", "status", "dueDate", "contactId"];

// ============================================================================
// BALDES DE FATURA
// ============================================================================

/// Classifica cada fatura em exatamente um balde.
///
/// pagata conta em paid; da_emettere só em contagem; emessa (e o legado
/// da_pagare) se divide entre overdue e pending pela data de vencimento,
/// comparada só como data. Vencimento hoje ainda NÃO é scaduta.
pub fn compute_invoice_stats(invoices: &[Invoice], today: NaiveDate) -> InvoiceStats {
    let mut stats = InvoiceStats::default();

    for invoice in invoices {
        let amount = invoice.amount;
        stats.total += 1;
        stats.total_amount += amount;

        match invoice.status.as_str() {
            STATUS_PAID => {
                stats.paid_amount += amount;
                stats.paid_count += 1;
            }
            STATUS_TO_ISSUE => {
                stats.to_issue_count += 1;
            }
            STATUS_ISSUED | STATUS_LEGACY_UNPAID => {
                match parse_date(invoice.due_date.as_deref()) {
                    Some(due) if due < today => {
                        stats.overdue_amount += amount;
                        stats.overdue_count += 1;
                    }
                    // Sem data (ou data ilegível) fica como pendente.
                    _ => {
                        stats.pending_amount += amount;
                        stats.issued_count += 1;
                    }
                }
            }
            _ => {}
        }
    }

    stats
}

/// Emessa/da_pagare: ainda espera pagamento.
pub fn is_pending_invoice(invoice: &Invoice) -> bool {
    matches!(invoice.status.as_str(), STATUS_ISSUED | STATUS_LEGACY_UNPAID)
}

pub fn is_overdue_invoice(invoice: &Invoice, today: NaiveDate) -> bool {
    is_pending_invoice(invoice)
        && parse_date(invoice.due_date.as_deref())
            .map(|due| due < today)
            .unwrap_or(false)
}

// ============================================================================
// REGIME FORFETTARIO
// ============================================================================

/// Resumo do ano: o fatturato conta pela DATA DE INCASSO (paidDate), nunca
/// pela data de emissão. O detalhe mensal vai de gennaio até o mês corrente.
pub fn forfettario_summary(
    invoices: &[Invoice],
    year: i32,
    today: NaiveDate,
) -> ForfettarioSummary {
    let paid_in_year: Vec<(u32, f64)> = invoices
        .iter()
        .filter(|invoice| invoice.status == STATUS_PAID)
        .filter_map(|invoice| {
            parse_date(invoice.paid_date.as_deref())
                .filter(|date| date.year() == year)
                .map(|date| (date.month0(), invoice.amount))
        })
        .collect();

    let used_amount: f64 = paid_in_year.iter().map(|(_, amount)| amount).sum();
    let remaining = FORFETTARIO_LIMIT - used_amount;
    let percentage_used = (used_amount / FORFETTARIO_LIMIT * 1000.0).round() / 10.0;

    let current_month = if today.year() == year { today.month0() } else { 11 };
    let monthly = (0..=current_month)
        .map(|month| MonthlyAmount {
            month,
            amount: paid_in_year
                .iter()
                .filter(|(m, _)| *m == month)
                .map(|(_, amount)| amount)
                .sum(),
        })
        .collect();

    ForfettarioSummary {
        year,
        limit: FORFETTARIO_LIMIT,
        used_amount,
        remaining,
        percentage_used,
        monthly,
    }
}

// ============================================================================
// DATAS
// ============================================================================

/// Os primeiros 10 caracteres de qualquer TEXT ISO ("2026-03-05" ou
/// "2026-03-05T10:00:00.000Z") viram uma data; o resto é ignorado.
pub fn parse_date(text: Option<&str>) -> Option<NaiveDate> {
    let text = text?;
    let prefix = text.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Data no formato numérico italiano, sem zeros à esquerda ("5/3/2026"),
/// como toLocaleDateString('it-IT') produz. Texto ilegível volta como veio.
pub fn format_date_it(text: &str) -> String {
    match parse_date(Some(text)) {
        Some(date) => date.format("%-d/%-m/%Y").to_string(),
        None => text.to_string(),
    }
}

// ============================================================================
// NÚMEROS it-IT
// ============================================================================

/// Reproduz toLocaleString('it-IT'): ponto nos milhares, vírgula nos
/// decimais, até 3 casas e sem zeros à direita ("1.234,5", "85.000").
pub fn format_number_it(value: f64) -> String {
    let formatted = format!("{:.3}", value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (formatted.as_str(), ""),
    };
    let frac = frac_part.trim_end_matches('0');

    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !frac.is_empty() {
        out.push(',');
        out.push_str(frac);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut groups: Vec<String> = Vec::new();
    let mut end = chars.len();
    while end > 3 {
        groups.push(chars[end - 3..end].iter().collect());
        end -= 3;
    }
    groups.push(chars[..end].iter().collect());
    groups.reverse();
    groups.join(".")
}

// ============================================================================
// EXPORT CSV
// ============================================================================

/// Gera o CSV de uma coleção serializável, pegando só as colunas pedidas.
/// Coleção vazia vira string vazia (sem cabeçalho), como o cliente espera.
pub fn generate_csv<T: Serialize>(items: &[T], columns: &[&str]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(columns.join(","));

    for item in items {
        let value = serde_json::to_value(item).unwrap_or(Value::Null);
        let row = columns
            .iter()
            .map(|column| csv_field(value.get(*column).unwrap_or(&Value::Null)))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(row);
    }

    lines.join("\n")
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => {
            if s.contains(',') || s.contains('"') {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.clone()
            }
        }
        // 5000.0 imprime como 5000, igual ao JSON do Node.
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fattura(status: &str, amount: f64, due: Option<&str>, paid: Option<&str>) -> Invoice {
        Invoice {
            id: 0,
            invoice_number: "F-1".to_string(),
            opportunity_id: None,
            contact_id: None,
            invoice_type: "emessa".to_string(),
            amount,
            issue_date: None,
            due_date: due.map(str::to_string),
            paid_date: paid.map(str::to_string),
            status: status.to_string(),
            notes: None,
            user_id: None,
            created_at: None,
            updated_at: None,
            opportunity_title: None,
            opportunity_company: None,
            contact_name: None,
        }
    }

    fn giorno(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn cada_fatura_cai_em_um_unico_balde() {
        let oggi = giorno("2026-04-15");
        let fatture = vec![
            fattura("pagata", 1000.0, Some("2026-03-01"), Some("2026-02-20")),
            fattura("da_emettere", 500.0, None, None),
            fattura("emessa", 800.0, Some("2026-04-10"), None), // scaduta
            fattura("emessa", 700.0, Some("2026-05-01"), None), // in attesa
            fattura("da_pagare", 300.0, Some("2026-01-31"), None), // legado, scaduta
        ];

        let stats = compute_invoice_stats(&fatture, oggi);

        assert_eq!(stats.total, 5);
        assert_eq!(stats.total_amount, 3300.0);
        assert_eq!(stats.paid_amount, 1000.0);
        assert_eq!(stats.paid_count, 1);
        assert_eq!(stats.overdue_amount, 1100.0);
        assert_eq!(stats.overdue_count, 2);
        assert_eq!(stats.pending_amount, 700.0);
        assert_eq!(stats.issued_count, 1);
        assert_eq!(stats.to_issue_count, 1);
    }

    #[test]
    fn vencimento_hoje_ainda_nao_e_scaduta() {
        let oggi = giorno("2026-04-15");
        let fatture = vec![fattura("emessa", 400.0, Some("2026-04-15"), None)];

        let stats = compute_invoice_stats(&fatture, oggi);
        assert_eq!(stats.overdue_count, 0);
        assert_eq!(stats.issued_count, 1);
    }

    #[test]
    fn emessa_sem_vencimento_fica_pendente() {
        let oggi = giorno("2026-04-15");
        let fatture = vec![fattura("emessa", 250.0, None, None)];

        let stats = compute_invoice_stats(&fatture, oggi);
        assert_eq!(stats.pending_amount, 250.0);
        assert_eq!(stats.overdue_count, 0);
    }

    #[test]
    fn forfettario_conta_so_o_incassato_do_ano() {
        let oggi = giorno("2026-04-15");
        let fatture = vec![
            fattura("pagata", 10000.0, None, Some("2026-01-10")),
            fattura("pagata", 20000.0, None, Some("2026-02-05")),
            fattura("pagata", 12500.0, None, Some("2026-04-01")),
            // fora: ano errado, ou ainda não paga
            fattura("pagata", 9999.0, None, Some("2025-12-30")),
            fattura("emessa", 5000.0, Some("2026-05-01"), None),
        ];

        let resumo = forfettario_summary(&fatture, 2026, oggi);

        assert_eq!(resumo.used_amount, 42500.0);
        assert_eq!(resumo.remaining, 42500.0);
        assert_eq!(resumo.percentage_used, 50.0);

        // gennaio..aprile inclusive, com março zerado.
        assert_eq!(resumo.monthly.len(), 4);
        assert_eq!(resumo.monthly[0].amount, 10000.0);
        assert_eq!(resumo.monthly[2].amount, 0.0);
        assert_eq!(resumo.monthly[3].amount, 12500.0);
    }

    #[test]
    fn percentuale_arredonda_a_uma_casa() {
        let oggi = giorno("2026-06-30");
        let fatture = vec![fattura("pagata", 38421.0, None, Some("2026-03-03"))];

        let resumo = forfettario_summary(&fatture, 2026, oggi);
        // 38421 / 85000 = 45.201...% -> 45.2
        assert_eq!(resumo.percentage_used, 45.2);
    }

    #[test]
    fn numeros_no_formato_italiano() {
        assert_eq!(format_number_it(85000.0), "85.000");
        assert_eq!(format_number_it(1234.56), "1.234,56");
        assert_eq!(format_number_it(1234.5), "1.234,5");
        assert_eq!(format_number_it(0.0), "0");
        assert_eq!(format_number_it(999.0), "999");
        assert_eq!(format_number_it(-4500.0), "-4.500");
        assert_eq!(format_number_it(1234567.0), "1.234.567");
    }

    #[test]
    fn datas_no_formato_italiano() {
        assert_eq!(format_date_it("2026-03-05"), "5/3/2026");
        assert_eq!(format_date_it("2026-11-21T08:30:00.000Z"), "21/11/2026");
        assert_eq!(format_date_it("boh"), "boh");
    }

    #[test]
    fn csv_escapa_virgulas_e_aspas() {
        #[derive(Serialize)]
        struct Riga {
            id: i64,
            name: String,
            value: f64,
        }

        let righe = vec![
            Riga { id: 1, name: "Rossi, Mario".to_string(), value: 5000.0 },
            Riga { id: 2, name: "Studio \"Alfa\"".to_string(), value: 1234.5 },
        ];

        let csv = generate_csv(&righe, &["id", "name", "value"]);
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some("id,name,value"));
        assert_eq!(lines.next(), Some("1,\"Rossi, Mario\",5000"));
        assert_eq!(lines.next(), Some("2,\"Studio \"\"Alfa\"\"\",1234.5"));
    }

    #[test]
    fn csv_de_colecao_vazia_e_vazio() {
        let nessuno: Vec<Invoice> = Vec::new();
        assert_eq!(generate_csv(&nessuno, &CONTACT_CSV_COLUMNS), "");
    }

    #[test]
    fn colunas_ausentes_viram_campo_vazio() {
        #[derive(Serialize)]
        struct Minima {
            id: i64,
        }

        let csv = generate_csv(&[Minima { id: 7 }], &["id", "name"]);
        assert_eq!(csv, "id,name\n7,");
    }
}
