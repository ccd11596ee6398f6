// src/services/chatbot.rs
//
// Assistente conversacional: monta o prompt de sistema com um retrato do
// CRM do usuário, percorre a lista de modelos gratuitos em fallback e
// devolve a resposta. O contexto é calculado aqui, puro, a partir do
// snapshot — nenhuma consulta ao banco depois que ele chega.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};

use crate::models::chat::{ChatMessage, ChatOutcome, CrmSnapshot, Suggestion};
use crate::models::crm::{Contact, Opportunity, PROJECT_STATUS_INITIAL};
use crate::models::invoice::Invoice;
use crate::services::openrouter::{
    Completion, CompletionBackend, CompletionError, CompletionProfile,
};
use crate::services::stats::{
    compute_invoice_stats, forfettario_summary, format_date_it, format_number_it,
    is_overdue_invoice, is_pending_invoice, parse_date, MONTHS_IT,
};

// Modelos gratuitos em ordem de preferência; o fallback percorre a lista
// de cima para baixo.
pub const FREE_MODELS: [&str; 10] = [
    // primeira linha: qualidade
    "xiaomi/mimo-v2-flash:free",
    "meta-llama/llama-3.3-70b-instruct:free", // 70B, multilíngue (italiano!)
    "google/gemini-2.0-flash-exp:free",       // o mais rápido, contexto 1M
    // agentes e raciocínio
    "z-ai/glm-4.5-air:free",
    "openai/gpt-oss-20b:free",
    "deepseek/deepseek-r1:free",
    "google/gemini-2.0-flash-thinking-exp:free",
    // reservas
    "deepseek/deepseek-chat-v3-0324:free",
    "qwen/qwq-32b:free",
    "deepseek/deepseek-r1-distill-llama-70b:free",
];

const MODELS_EXHAUSTED: &str =
    "Tutti i modelli AI sono temporaneamente non disponibili. Riprova tra qualche minuto.";

// (tipo, pergunta pronta) do endpoint de consultas rápidas.
pub const QUICK_QUERIES: &[(&str, &str)] = &[
    (
        "fatturato-anno",
        "Quanto ho fatturato quest'anno? Dammi il dettaglio mensile.",
    ),
    (
        "budget-rimasto",
        "Quanto budget forfettario mi rimane per quest'anno?",
    ),
    ("task-urgenti", "Quali sono i miei task più urgenti?"),
    ("fatture-scadute", "Ho fatture scadute? Se sì, quali?"),
    ("pipeline-status", "Com'è la mia pipeline commerciale?"),
    ("progetti-attivi", "Quali progetti ho in corso?"),
    (
        "riepilogo-generale",
        "Dammi un riepilogo generale della mia situazione business.",
    ),
    (
        "prossime-scadenze",
        "Quali sono le prossime scadenze importanti?",
    ),
];

pub fn quick_query(query_type: &str) -> Option<&'static str> {
    QUICK_QUERIES
        .iter()
        .find(|(kind, _)| *kind == query_type)
        .map(|(_, message)| *message)
}

const SYSTEM_PROMPT: &str = r#"Sei l'assistente AI di VAIB, il business assistant AI per freelancer italiani in regime forfettario.

Il tuo ruolo è:
1. Rispondere a domande sui dati del CRM (fatture, contatti, opportunità, progetti, task)
2. Fornire analisi e insights sui dati
3. Dare suggerimenti per migliorare il business
4. POPOLARE IL CRM automaticamente dalla conversazione - questa è la tua funzione principale!
5. Aiutare l'utente a navigare e usare il software

## AZIONI CRM - POPOLA IL CRM DALLA CONVERSAZIONE
Sei un assistente PROATTIVO. Quando l'utente ti racconta di clienti, opportunità, meeting o cose da fare, DEVI capire dal contesto e creare automaticamente le entità nel CRM.

NON aspettare comandi espliciti come "crea contatto". Inferisci dall'informazione!

Formato azione: [ACTION:tipo_azione:dati_json]

Tipi di azione:
- create_contact: Crea un nuovo contatto
- create_opportunity: Crea una nuova opportunità
- create_task: Crea un nuovo task

## ESEMPI DI INFERENZA INTELLIGENTE

1. RACCONTO DI UN POTENZIALE CLIENTE:
Utente: "Ho parlato con Marco Bianchi di DesignLab, è interessato a un redesign del sito per circa 8000€"
Tu: Ottimo contatto! Ho creato Marco Bianchi (DesignLab) come Lead e aperto un'opportunità "Redesign sito" da €8.000.
[ACTION:create_contact:{"name":"Marco Bianchi","company":"DesignLab","status":"Lead","notes":"Interessato a redesign sito"}]
[ACTION:create_opportunity:{"title":"Redesign sito DesignLab","company":"DesignLab","value":8000,"stage":"Lead"}]

2. MEETING CON CLIENTE:
Utente: "Domani ho una call con Anna Verdi per discutere di un progetto e-commerce"
Tu: Perfetto! Ho aggiunto Anna Verdi ai contatti e creato un task per la call di domani.
[ACTION:create_contact:{"name":"Anna Verdi","status":"Prospect","notes":"Discussione progetto e-commerce"}]
[ACTION:create_task:{"title":"Call con Anna Verdi - progetto e-commerce","dueDate":"TOMORROW","priority":"Alta"}]

3. OPPORTUNITÀ IN CORSO:
Utente: "TechCorp mi ha chiesto un preventivo per 15000€, devo mandarglielo entro venerdì"
Tu: Ho creato l'opportunità TechCorp da €15.000 in fase "Follow Up da fare" e un task per il preventivo.
[ACTION:create_opportunity:{"title":"Preventivo TechCorp","company":"TechCorp","value":15000,"stage":"Follow Up da fare"}]
[ACTION:create_task:{"title":"Inviare preventivo a TechCorp","dueDate":"NEXT_WEEK","priority":"Alta"}]

4. TASK DA FARE:
Utente: "Devo ricordarmi di chiamare il cliente della pizza per il sito"
Tu: Task aggiunto! Ti ricorderò di chiamare per il progetto sito.
[ACTION:create_task:{"title":"Chiamare cliente pizzeria per sito","priority":"Media"}]

5. AGGIORNAMENTO DEAL:
Utente: "Ferrari Design ha accettato il preventivo!"
Tu: Fantastico! Se vuoi posso spostare l'opportunità Ferrari Design in "Chiuso Vinto". Confermi?

## REGOLE PER L'INFERENZA
- Se l'utente menziona una PERSONA + AZIENDA → crea contatto
- Se menziona un PROGETTO/LAVORO + VALORE → crea opportunità
- Se menziona SCADENZA/REMINDER/FARE → crea task
- Se il contatto/azienda ESISTE GIÀ nei dati, NON crearlo di nuovo
- In caso di DUBBIO sull'importo o dettagli, CHIEDI conferma prima di creare
- Puoi creare MULTIPLE azioni in una risposta (es: contatto + opportunità + task)

## FORMATO AZIONI
- Per le date usa: "TODAY", "TOMORROW", "NEXT_WEEK" o formato "YYYY-MM-DD"
- Per stage opportunità: "Lead", "In contatto", "Follow Up da fare", "Revisionare offerta", "Chiuso Vinto", "Chiuso Perso"
- Per status contatto: "Lead", "Prospect", "Cliente"
- Per priorità task: "Alta", "Media", "Bassa"
- Conferma SEMPRE cosa hai creato in modo chiaro e amichevole

Regole importanti:
- Rispondi SEMPRE in italiano
- Sii conciso ma completo
- Usa i dati reali forniti nel contesto
- Per il regime forfettario: il fatturato conta sulla DATA DI INCASSO (paidDate), non sulla data fattura
- Il limite forfettario è €85.000 annui
- Quando dai cifre, formattale in italiano (es: €1.234,56)
- Se non hai dati sufficienti per rispondere, dillo chiaramente
- Suggerisci azioni concrete quando appropriato

Funzionalità del software che puoi spiegare:
- Dashboard: panoramica KPI e metriche
- Pipeline: gestione opportunità commerciali (Lead → Contatto → Proposta → Negoziazione → Vinto/Perso)
- Contatti: gestione clienti, prospects, lead
- Progetti: gestione progetti vinti (In Lavorazione → In Revisione → Consegnato → Chiuso)
- Attività: task con priorità e scadenze
- Scadenziario Fatture: tracking fatture con stato forfettario
- Calendario: vista calendario attività"#;

// ============================================================================
// SERVIÇO
// ============================================================================

#[derive(Clone)]
pub struct ChatbotService {
    backend: Arc<dyn CompletionBackend>,
}

impl ChatbotService {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Conversa com o assistente. Esgotar os modelos nunca vira erro HTTP:
    /// o cliente recebe success=false com uma desculpa em italiano.
    pub async fn chat(
        &self,
        user_message: &str,
        snapshot: &CrmSnapshot,
        history: &[ChatMessage],
    ) -> ChatOutcome {
        let context = build_context(snapshot, Utc::now().date_naive());

        // sistema + últimas 10 mensagens + a nova pergunta
        let tail = history.len().saturating_sub(10);
        let mut messages = Vec::with_capacity(history.len() - tail + 2);
        messages.push(ChatMessage::system(format!("{SYSTEM_PROMPT}\n\n{context}")));
        messages.extend_from_slice(&history[tail..]);
        messages.push(ChatMessage::user(user_message));

        match self.call_with_fallback(&messages).await {
            Ok(completion) => ChatOutcome {
                success: true,
                message: completion.content,
                model: Some(completion.model),
            },
            Err(reason) => {
                tracing::error!("[AI Chatbot] Chat error: {reason}");
                ChatOutcome {
                    success: false,
                    message: format!("Mi dispiace, si è verificato un errore: {reason}"),
                    model: None,
                }
            }
        }
    }

    // Percorre FREE_MODELS até a primeira resposta. Falhas ritentáveis
    // (sobrecarga, rede, resposta vazia) sempre avançam; um erro definitivo
    // também avança, exceto no último modelo, onde a mensagem dele é a que
    // chega ao usuário.
    async fn call_with_fallback(&self, messages: &[ChatMessage]) -> Result<Completion, String> {
        let profile = CompletionProfile::chat();

        for (index, model) in FREE_MODELS.iter().enumerate() {
            tracing::info!("[AI Chatbot] Trying model: {model}");

            match self.backend.complete(model, messages, &profile).await {
                Ok(completion) => {
                    tracing::info!("[AI Chatbot] Success with model: {model}");
                    return Ok(completion);
                }
                Err(CompletionError::Retryable(reason)) => {
                    tracing::warn!("[AI Chatbot] Model {model} failed ({reason}), falling back");
                }
                Err(CompletionError::Fatal(message)) => {
                    tracing::error!("[AI Chatbot] Model {model} failed: {message}");
                    if index == FREE_MODELS.len() - 1 {
                        return Err(message);
                    }
                }
            }
        }

        Err(MODELS_EXHAUSTED.to_string())
    }
}

// ============================================================================
// CONTEXTO
// ============================================================================

/// Retrato do CRM em linguagem natural, anexado ao prompt de sistema.
/// Contas e listas usam os mesmos baldes das estatísticas de fatura, e as
/// listas são cortadas nos primeiros 5 itens.
pub fn build_context(snapshot: &CrmSnapshot, today: NaiveDate) -> String {
    let year = today.year();

    let total_contacts = snapshot.contacts.len();
    let clients = count_status(&snapshot.contacts, "Cliente");
    let prospects = count_status(&snapshot.contacts, "Prospect");

    let won: Vec<&Opportunity> = snapshot.opportunities.iter().filter(|o| o.is_won()).collect();
    let open: Vec<&Opportunity> = snapshot.opportunities.iter().filter(|o| o.is_open()).collect();
    let total_pipeline: f64 = open.iter().map(|o| o.value).sum();
    let won_value: f64 = won.iter().map(|o| o.value).sum();

    let stats = compute_invoice_stats(&snapshot.invoices, today);
    let pending_invoices: Vec<&Invoice> = snapshot
        .invoices
        .iter()
        .filter(|invoice| is_pending_invoice(invoice) && !is_overdue_invoice(invoice, today))
        .collect();

    let summary = forfettario_summary(&snapshot.invoices, year, today);
    let monthly_lines = summary
        .monthly
        .iter()
        .map(|entry| {
            format!(
                "- {}: €{}",
                MONTHS_IT[entry.month as usize],
                format_number_it(entry.amount)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let pending_tasks: Vec<_> = snapshot.tasks.iter().filter(|t| !t.is_completed()).collect();
    let overdue_tasks: Vec<_> = pending_tasks
        .iter()
        .copied()
        .filter(|t| parse_date(t.due_date.as_deref()).is_some_and(|due| due < today))
        .collect();
    let high_priority = pending_tasks.iter().filter(|t| t.priority == "Alta").count();

    // oportunidades vintas viram projetos; sem status gravado = em corso
    let in_progress: Vec<&Opportunity> = won
        .iter()
        .copied()
        .filter(|o| matches!(o.project_status.as_deref(), Some(PROJECT_STATUS_INITIAL) | None))
        .collect();
    let in_review = count_project_status(&won, "in_revisione");
    let delivered = count_project_status(&won, "consegnato");
    let closed = count_project_status(&won, "chiuso");

    let project_lines = list_or(
        in_progress.iter().take(5).map(|p| {
            format!(
                "- \"{}\" - {} - €{}",
                p.title,
                p.company.as_deref().unwrap_or("N/A"),
                format_number_it(p.value)
            )
        }),
        "Nessun progetto attivo",
    );

    let overdue_task_lines = list_or(
        overdue_tasks.iter().take(5).map(|t| {
            format!(
                "- \"{}\" - Scaduto il {}",
                t.title,
                format_date_it(t.due_date.as_deref().unwrap_or(""))
            )
        }),
        "Nessun task scaduto",
    );

    let pending_invoice_lines = list_or(
        pending_invoices.iter().take(5).map(|i| {
            format!(
                "- {} - {} - €{} - Scade: {}",
                if i.invoice_number.is_empty() { "N/A" } else { i.invoice_number.as_str() },
                i.contact_name.as_deref().unwrap_or("N/A"),
                format_number_it(i.amount),
                i.due_date
                    .as_deref()
                    .map(format_date_it)
                    .unwrap_or_else(|| "N/A".to_string()),
            )
        }),
        "Nessuna fattura in attesa",
    );

    format!(
        "\n\
         ## CONTESTO CRM ATTUALE (Dati in tempo reale)\n\
         \n\
         ### Regime Forfettario\n\
         - Limite annuale: €85.000\n\
         - Fatturato {year} (incassato): €{used}\n\
         - Budget rimanente: €{remaining}\n\
         - Percentuale utilizzata: {percentage:.1}%\n\
         \n\
         ### Fatturazione Mensile {year}\n\
         {monthly_lines}\n\
         \n\
         ### Fatture\n\
         - Totale fatture: {total_invoices}\n\
         - Pagate: {paid_count} (€{paid_amount})\n\
         - In attesa: {pending_count} (€{pending_amount})\n\
         - Scadute: {overdue_count} (€{overdue_amount})\n\
         \n\
         ### Contatti\n\
         - Totale: {total_contacts}\n\
         - Clienti attivi: {clients}\n\
         - Prospects: {prospects}\n\
         - Lead: {leads}\n\
         \n\
         ### Pipeline Commerciale\n\
         - Opportunità aperte: {open_count}\n\
         - Valore pipeline: €{pipeline}\n\
         - Opportunità vinte: {won_count}\n\
         - Valore vinto: €{won_amount}\n\
         \n\
         ### Progetti Attivi\n\
         - In lavorazione: {in_progress_count}\n\
         - In revisione: {in_review}\n\
         - Consegnati: {delivered}\n\
         - Chiusi: {closed}\n\
         \n\
         ### Attività\n\
         - Task pendenti: {pending_task_count}\n\
         - Task scaduti: {overdue_task_count}\n\
         - Alta priorità: {high_priority}\n\
         \n\
         ### Lista Progetti Attivi\n\
         {project_lines}\n\
         \n\
         ### Task Urgenti\n\
         {overdue_task_lines}\n\
         \n\
         ### Fatture In Attesa\n\
         {pending_invoice_lines}\n",
        used = format_number_it(summary.used_amount),
        remaining = format_number_it(summary.remaining),
        percentage = summary.percentage_used,
        total_invoices = stats.total,
        paid_count = stats.paid_count,
        paid_amount = format_number_it(stats.paid_amount),
        pending_count = stats.issued_count,
        pending_amount = format_number_it(stats.pending_amount),
        overdue_count = stats.overdue_count,
        overdue_amount = format_number_it(stats.overdue_amount),
        leads = total_contacts - clients - prospects,
        open_count = open.len(),
        pipeline = format_number_it(total_pipeline),
        won_count = won.len(),
        won_amount = format_number_it(won_value),
        in_progress_count = in_progress.len(),
        pending_task_count = pending_tasks.len(),
        overdue_task_count = overdue_tasks.len(),
    )
}

fn count_status(contacts: &[Contact], status: &str) -> usize {
    contacts.iter().filter(|c| c.status == status).count()
}

fn count_project_status(won: &[&Opportunity], status: &str) -> usize {
    won.iter()
        .filter(|o| o.project_status.as_deref() == Some(status))
        .count()
}

// Lista "- item" por linha, ou a frase de vazio quando não há itens.
fn list_or(lines: impl Iterator<Item = String>, empty: &str) -> String {
    let joined = lines.collect::<Vec<_>>().join("\n");
    if joined.is_empty() {
        empty.to_string()
    } else {
        joined
    }
}

// ============================================================================
// SUGESTÕES RÁPIDAS
// ============================================================================

/// Alertas prontos para a barra do chatbot: task vencidos, fatture scadute,
/// pipeline aberto e limite forfettario quase esgotado.
pub fn quick_suggestions(snapshot: &CrmSnapshot, today: NaiveDate) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    let overdue_tasks = snapshot
        .tasks
        .iter()
        .filter(|t| !t.is_completed())
        .filter(|t| parse_date(t.due_date.as_deref()).is_some_and(|due| due < today))
        .count();
    if overdue_tasks > 0 {
        suggestions.push(Suggestion {
            kind: "warning".to_string(),
            text: format!("Hai {overdue_tasks} task scaduti"),
            action: "Mostra task scaduti".to_string(),
        });
    }

    let (overdue_count, overdue_total) = snapshot
        .invoices
        .iter()
        .filter(|i| is_overdue_invoice(i, today))
        .fold((0_usize, 0.0_f64), |(count, sum), i| (count + 1, sum + i.amount));
    if overdue_count > 0 {
        suggestions.push(Suggestion {
            kind: "danger".to_string(),
            text: format!(
                "{overdue_count} fatture scadute (€{})",
                format_number_it(overdue_total)
            ),
            action: "Mostra fatture scadute".to_string(),
        });
    }

    let pipeline_value: f64 = snapshot
        .opportunities
        .iter()
        .filter(|o| o.is_open())
        .map(|o| o.value)
        .sum();
    if snapshot.opportunities.iter().any(|o| o.is_open()) {
        suggestions.push(Suggestion {
            kind: "info".to_string(),
            text: format!("Pipeline attiva: €{}", format_number_it(pipeline_value)),
            action: "Analizza pipeline".to_string(),
        });
    }

    let summary = forfettario_summary(&snapshot.invoices, today.year(), today);
    if summary.remaining < 10000.0 {
        suggestions.push(Suggestion {
            kind: "warning".to_string(),
            text: format!(
                "Attenzione: solo €{} rimasti nel limite forfettario",
                format_number_it(summary.remaining)
            ),
            action: "Analizza forfettario".to_string(),
        });
    }

    suggestions
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::crm::{Task, STAGE_WON};
    use crate::services::openrouter::testing::ScriptedBackend;

    fn dia(ano: i32, mes: u32, giorno: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(ano, mes, giorno).unwrap()
    }

    fn contato(status: &str) -> Contact {
        Contact {
            id: 1,
            name: "Mario Rossi".to_string(),
            company: None,
            email: None,
            phone: None,
            value: 0.0,
            status: status.to_string(),
            avatar: None,
            last_contact: None,
            notes: None,
            user_id: Some(1),
            created_at: None,
            updated_at: None,
        }
    }

    fn oportunidade(title: &str, value: f64, stage: &str) -> Opportunity {
        Opportunity {
            id: 1,
            title: title.to_string(),
            company: None,
            value,
            stage: stage.to_string(),
            probability: 30,
            open_date: None,
            close_date: None,
            owner: None,
            contact_id: None,
            user_id: Some(1),
            original_stage: None,
            project_status: None,
            expected_invoice_date: None,
            expected_payment_date: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn tarefa(title: &str, due: Option<&str>, status: &str, priority: &str) -> Task {
        Task {
            id: 1,
            title: title.to_string(),
            task_type: "Chiamata".to_string(),
            priority: priority.to_string(),
            due_date: due.map(str::to_string),
            status: status.to_string(),
            contact_id: None,
            opportunity_id: None,
            user_id: Some(1),
            description: None,
            completed_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn fattura(
        number: &str,
        status: &str,
        amount: f64,
        due: Option<&str>,
        paid: Option<&str>,
        client: Option<&str>,
    ) -> Invoice {
        Invoice {
            id: 1,
            invoice_number: number.to_string(),
            opportunity_id: None,
            contact_id: None,
            invoice_type: "fattura".to_string(),
            amount,
            issue_date: None,
            due_date: due.map(str::to_string),
            paid_date: paid.map(str::to_string),
            status: status.to_string(),
            notes: None,
            user_id: Some(1),
            created_at: None,
            updated_at: None,
            opportunity_title: None,
            opportunity_company: None,
            contact_name: client.map(str::to_string),
        }
    }

    fn snapshot_demo() -> CrmSnapshot {
        let mut logo = oportunidade("Logo", 2000.0, STAGE_WON);
        logo.company = Some("ACME Srl".to_string());

        CrmSnapshot {
            contacts: vec![contato("Cliente"), contato("Prospect"), contato("Lead")],
            opportunities: vec![oportunidade("Sito web", 8000.0, "In contatto"), logo],
            tasks: vec![
                tarefa("Chiamare Mario", Some("2026-01-10"), "Da fare", "Media"),
                tarefa("Preparare preventivo", Some("2026-04-01"), "Da fare", "Alta"),
                tarefa("Archiviare contratto", None, "Completata", "Bassa"),
            ],
            invoices: vec![
                fattura("2026-001", "pagata", 42500.0, None, Some("2026-02-10"), None),
                fattura(
                    "2026-002",
                    "emessa",
                    700.0,
                    Some("2026-04-30"),
                    None,
                    Some("Mario Rossi"),
                ),
                fattura("2026-003", "emessa", 1100.0, Some("2026-01-31"), None, None),
            ],
        }
    }

    #[test]
    fn contexto_traz_forfettario_baldes_e_listas() {
        let contexto = build_context(&snapshot_demo(), dia(2026, 3, 15));

        assert!(contexto.contains("- Fatturato 2026 (incassato): €42.500"));
        assert!(contexto.contains("- Budget rimanente: €42.500"));
        assert!(contexto.contains("- Percentuale utilizzata: 50.0%"));

        // o detalhe mensal para no mês corrente
        assert!(contexto.contains("- Febbraio: €42.500"));
        assert!(contexto.contains("- Marzo: €0"));
        assert!(!contexto.contains("- Aprile:"));

        assert!(contexto.contains("- Totale fatture: 3"));
        assert!(contexto.contains("- Pagate: 1 (€42.500)"));
        assert!(contexto.contains("- In attesa: 1 (€700)"));
        assert!(contexto.contains("- Scadute: 1 (€1.100)"));

        assert!(contexto.contains("- Clienti attivi: 1"));
        assert!(contexto.contains("- Lead: 1"));
        assert!(contexto.contains("- Valore pipeline: €8.000"));
        assert!(contexto.contains("- Valore vinto: €2.000"));
        assert!(contexto.contains("- In lavorazione: 1"));

        assert!(contexto.contains("- Task pendenti: 2"));
        assert!(contexto.contains("- Task scaduti: 1"));
        assert!(contexto.contains("- Alta priorità: 1"));

        assert!(contexto.contains(r#"- "Logo" - ACME Srl - €2.000"#));
        assert!(contexto.contains(r#"- "Chiamare Mario" - Scaduto il 10/1/2026"#));
        assert!(contexto.contains("- 2026-002 - Mario Rossi - €700 - Scade: 30/4/2026"));
    }

    #[test]
    fn contexto_vazio_usa_as_frases_de_fallback() {
        let contexto = build_context(&CrmSnapshot::default(), dia(2026, 3, 15));

        assert!(contexto.contains("- Totale fatture: 0"));
        assert!(contexto.contains("- Percentuale utilizzata: 0.0%"));
        assert!(contexto.contains("Nessun progetto attivo"));
        assert!(contexto.contains("Nessun task scaduto"));
        assert!(contexto.contains("Nessuna fattura in attesa"));
    }

    #[tokio::test]
    async fn fallback_avanca_ate_o_primeiro_sucesso() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(CompletionError::Retryable("HTTP 429".to_string())),
            Err(CompletionError::Retryable("HTTP 503".to_string())),
            Ok("Ciao! Come posso aiutarti?".to_string()),
        ]));
        let service = ChatbotService::new(backend.clone());

        let resultado = service.chat("Ciao", &CrmSnapshot::default(), &[]).await;

        assert!(resultado.success);
        assert_eq!(resultado.message, "Ciao! Come posso aiutarti?");
        assert_eq!(resultado.model.as_deref(), Some(FREE_MODELS[2]));
        assert_eq!(backend.models_called(), &FREE_MODELS[..3]);
    }

    #[tokio::test]
    async fn prompt_de_sistema_carrega_o_contexto() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("ok".to_string())]));
        let service = ChatbotService::new(backend.clone());

        service.chat("Quanto ho fatturato?", &snapshot_demo(), &[]).await;

        let mensagens = backend.last_messages();
        assert_eq!(mensagens[0].role, "system");
        assert!(mensagens[0].content.starts_with("Sei l'assistente AI di VAIB"));
        assert!(mensagens[0].content.contains("## CONTESTO CRM ATTUALE"));
        assert_eq!(mensagens[1].content, "Quanto ho fatturato?");
    }

    #[tokio::test]
    async fn historico_fica_nas_ultimas_dez_mensagens() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("ok".to_string())]));
        let service = ChatbotService::new(backend.clone());

        let historia: Vec<ChatMessage> = (0..15)
            .map(|i| ChatMessage::user(format!("messaggio {i}")))
            .collect();
        service.chat("ultima", &CrmSnapshot::default(), &historia).await;

        let mensagens = backend.last_messages();
        assert_eq!(mensagens.len(), 12); // sistema + 10 + a nova pergunta
        assert_eq!(mensagens[1].content, "messaggio 5");
        assert_eq!(mensagens[11].content, "ultima");
    }

    #[tokio::test]
    async fn erro_definitivo_no_meio_da_lista_avanca() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(CompletionError::Fatal("richiesta non valida".to_string())),
            Ok("Riprovo io".to_string()),
        ]));
        let service = ChatbotService::new(backend.clone());

        let resultado = service.chat("Ciao", &CrmSnapshot::default(), &[]).await;

        assert!(resultado.success);
        assert_eq!(resultado.model.as_deref(), Some(FREE_MODELS[1]));
    }

    #[tokio::test]
    async fn erro_definitivo_no_ultimo_modelo_chega_ao_usuario() {
        let mut roteiro: Vec<Result<String, CompletionError>> =
            vec![Err(CompletionError::Retryable("HTTP 429".to_string())); 9];
        roteiro.push(Err(CompletionError::Fatal("Invalid API key".to_string())));

        let backend = Arc::new(ScriptedBackend::new(roteiro));
        let service = ChatbotService::new(backend.clone());

        let resultado = service.chat("Ciao", &CrmSnapshot::default(), &[]).await;

        assert!(!resultado.success);
        assert_eq!(
            resultado.message,
            "Mi dispiace, si è verificato un errore: Invalid API key"
        );
        assert_eq!(resultado.model, None);
        assert_eq!(backend.models_called().len(), FREE_MODELS.len());
    }

    #[tokio::test]
    async fn esgotar_os_modelos_vira_desculpa_em_italiano() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(CompletionError::Retryable(
                "HTTP 429".to_string()
            ));
            10
        ]));
        let service = ChatbotService::new(backend);

        let resultado = service.chat("Ciao", &CrmSnapshot::default(), &[]).await;

        assert!(!resultado.success);
        assert_eq!(
            resultado.message,
            "Mi dispiace, si è verificato un errore: Tutti i modelli AI sono temporaneamente \
             non disponibili. Riprova tra qualche minuto."
        );
    }

    #[test]
    fn sugestoes_cobrem_alertas_e_pipeline() {
        let hoje = dia(2026, 3, 15);
        let mut snapshot = snapshot_demo();
        // deixa o limite quase esgotado: 42.500 + 40.000 incassados
        snapshot
            .invoices
            .push(fattura("2026-004", "pagata", 40000.0, None, Some("2026-03-01"), None));

        let sugestoes = quick_suggestions(&snapshot, hoje);

        let tipos: Vec<&str> = sugestoes.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(tipos, ["warning", "danger", "info", "warning"]);
        assert_eq!(sugestoes[0].text, "Hai 1 task scaduti");
        assert_eq!(sugestoes[1].text, "1 fatture scadute (€1.100)");
        assert_eq!(sugestoes[2].text, "Pipeline attiva: €8.000");
        assert_eq!(
            sugestoes[3].text,
            "Attenzione: solo €2.500 rimasti nel limite forfettario"
        );

        assert!(quick_suggestions(&CrmSnapshot::default(), hoje).is_empty());
    }

    #[test]
    fn consultas_rapidas_sao_um_dicionario_fechado() {
        assert_eq!(
            quick_query("budget-rimasto"),
            Some("Quanto budget forfettario mi rimane per quest'anno?")
        );
        assert!(quick_query("qualcosa-altro").is_none());
        assert_eq!(QUICK_QUERIES.len(), 8);
    }
}
