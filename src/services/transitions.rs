// src/services/transitions.rs
//
// As regras de transição dos PATCHes estreitos, separadas das repos para
// serem testáveis sem banco: o handler busca a linha atual, pede o plano
// aqui e manda a repo aplicar.

use chrono::{SecondsFormat, Utc};

use crate::common::error::AppError;
use crate::models::crm::{
    is_closed_stage, is_valid_project_status, is_won_stage, stage_probability, Opportunity,
    StagePatchPayload, StagePlan, PROJECT_STATUS_INITIAL, TASK_STATUS_DONE, TASK_STATUS_TODO,
};

// ============================================================================
// RELÓGIO
// ============================================================================

/// Instante corrente no formato que o cliente JS espera
/// ("2026-08-21T10:30:00.000Z").
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Data corrente "YYYY-MM-DD", usada nas comparações só-de-data.
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

// ============================================================================
// ATIVIDADES
// ============================================================================

/// "Completata" carimba o instante; qualquer outro status limpa a coluna.
pub fn completion_stamp(status: Option<&str>, now: &str) -> Option<String> {
    if status == Some(TASK_STATUS_DONE) {
        Some(now.to_string())
    } else {
        None
    }
}

/// O toggle do kanban alterna entre concluída e a fazer.
pub fn toggled_status(current: &str) -> &'static str {
    if current == TASK_STATUS_DONE {
        TASK_STATUS_TODO
    } else {
        TASK_STATUS_DONE
    }
}

// ============================================================================
// OPORTUNIDADES
// ============================================================================

/// Calcula as colunas finais de um arrasto de estágio.
///
/// - Para "Chiuso Vinto": liga o projeto (`in_lavorazione` se ainda não
///   houver um status) e grava as datas previstas que vieram no corpo.
/// - Para qualquer outro estágio: desliga o projeto.
/// - `originalStage` registra COMO a oportunidade fechou na primeira vez e
///   nunca mais muda, mesmo que ela seja reaberta.
pub fn plan_stage_change(
    current: &Opportunity,
    patch: &StagePatchPayload,
) -> Result<StagePlan, AppError> {
    let stage = patch
        .stage
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::invalid("Stage is required"))?;

    let probability = patch.probability.unwrap_or_else(|| stage_probability(stage));
    let won = is_won_stage(stage);

    let original_stage = if is_closed_stage(stage) && current.original_stage.is_none() {
        Some(stage.to_string())
    } else {
        current.original_stage.clone()
    };

    let project_status = if won {
        current
            .project_status
            .clone()
            .or_else(|| Some(PROJECT_STATUS_INITIAL.to_string()))
    } else {
        None
    };

    let (expected_invoice_date, expected_payment_date) = if won {
        (
            patch
                .expected_invoice_date
                .clone()
                .or_else(|| current.expected_invoice_date.clone()),
            patch
                .expected_payment_date
                .clone()
                .or_else(|| current.expected_payment_date.clone()),
        )
    } else {
        (
            current.expected_invoice_date.clone(),
            current.expected_payment_date.clone(),
        )
    };

    Ok(StagePlan {
        stage: stage.to_string(),
        probability,
        original_stage,
        project_status,
        expected_invoice_date,
        expected_payment_date,
    })
}

/// O kanban de projetos só mexe em oportunidades ganhas.
pub fn validated_project_status(
    current: &Opportunity,
    project_status: Option<&str>,
) -> Result<String, AppError> {
    let project_status = project_status
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::invalid("Project status is required"))?;

    if !is_valid_project_status(project_status) {
        return Err(AppError::invalid("Invalid project status"));
    }
    if !current.is_won() {
        return Err(AppError::invalid(
            "Project status can only be set on won opportunities",
        ));
    }

    Ok(project_status.to_string())
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::crm::STAGE_WON;

    fn oportunidade(stage: &str) -> Opportunity {
        Opportunity {
            id: 1,
            title: "Sito web".to_string(),
            company: Some("ACME Srl".to_string()),
            value: 8000.0,
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

    fn para(stage: &str) -> StagePatchPayload {
        StagePatchPayload {
            stage: Some(stage.to_string()),
            ..StagePatchPayload::default()
        }
    }

    #[test]
    fn fechar_como_vinto_liga_o_projeto() {
        let atual = oportunidade("Revisionare offerta");
        let patch = StagePatchPayload {
            expected_invoice_date: Some("2026-03-31".to_string()),
            expected_payment_date: Some("2026-04-30".to_string()),
            ..para(STAGE_WON)
        };

        let plano = plan_stage_change(&atual, &patch).unwrap();

        assert_eq!(plano.stage, STAGE_WON);
        assert_eq!(plano.probability, 100);
        assert_eq!(plano.original_stage.as_deref(), Some(STAGE_WON));
        assert_eq!(plano.project_status.as_deref(), Some(PROJECT_STATUS_INITIAL));
        assert_eq!(plano.expected_invoice_date.as_deref(), Some("2026-03-31"));
        assert_eq!(plano.expected_payment_date.as_deref(), Some("2026-04-30"));
    }

    #[test]
    fn reabrir_desliga_o_projeto_mas_preserva_a_memoria() {
        let mut atual = oportunidade(STAGE_WON);
        atual.original_stage = Some(STAGE_WON.to_string());
        atual.project_status = Some("in_revisione".to_string());
        atual.expected_invoice_date = Some("2026-03-31".to_string());

        let plano = plan_stage_change(&atual, &para("Follow Up da fare")).unwrap();

        assert_eq!(plano.stage, "Follow Up da fare");
        assert_eq!(plano.probability, 50);
        assert_eq!(plano.project_status, None);
        // O histórico de fechamento e as datas previstas não se perdem.
        assert_eq!(plano.original_stage.as_deref(), Some(STAGE_WON));
        assert_eq!(plano.expected_invoice_date.as_deref(), Some("2026-03-31"));
    }

    #[test]
    fn segunda_vitoria_nao_reinicia_o_projeto() {
        let mut atual = oportunidade("In contatto");
        atual.original_stage = Some("Chiuso Perso".to_string());
        atual.project_status = Some("consegnato".to_string());

        let plano = plan_stage_change(&atual, &para(STAGE_WON)).unwrap();

        // originalStage já estava gravado: fica como estava.
        assert_eq!(plano.original_stage.as_deref(), Some("Chiuso Perso"));
        assert_eq!(plano.project_status.as_deref(), Some("consegnato"));
    }

    #[test]
    fn probabilidade_explicita_vence_a_tabela() {
        let atual = oportunidade("Lead");

        let sem = plan_stage_change(&atual, &para("In contatto")).unwrap();
        assert_eq!(sem.probability, 30);

        let com = plan_stage_change(
            &atual,
            &StagePatchPayload {
                probability: Some(65),
                ..para("In contatto")
            },
        )
        .unwrap();
        assert_eq!(com.probability, 65);
    }

    #[test]
    fn estagio_ausente_e_rejeitado() {
        let atual = oportunidade("Lead");
        let erro = plan_stage_change(&atual, &StagePatchPayload::default()).unwrap_err();
        assert!(matches!(erro, AppError::Invalid(_)));
    }

    #[test]
    fn status_de_projeto_exige_oportunidade_vinta() {
        let aberta = oportunidade("In contatto");
        let erro = validated_project_status(&aberta, Some("in_revisione")).unwrap_err();
        assert!(matches!(erro, AppError::Invalid(_)));

        let vinta = oportunidade(STAGE_WON);
        let ok = validated_project_status(&vinta, Some("in_revisione")).unwrap();
        assert_eq!(ok, "in_revisione");

        let erro = validated_project_status(&vinta, Some("quasi_pronto")).unwrap_err();
        assert!(matches!(erro, AppError::Invalid(_)));
    }

    #[test]
    fn carimbo_de_conclusao_segue_o_status() {
        let agora = "2026-08-21T10:00:00.000Z";

        assert_eq!(
            completion_stamp(Some(TASK_STATUS_DONE), agora).as_deref(),
            Some(agora)
        );
        assert_eq!(completion_stamp(Some(TASK_STATUS_TODO), agora), None);
        assert_eq!(completion_stamp(None, agora), None);
    }

    #[test]
    fn toggle_alterna_os_dois_sentidos() {
        assert_eq!(toggled_status(TASK_STATUS_DONE), TASK_STATUS_TODO);
        assert_eq!(toggled_status(TASK_STATUS_TODO), TASK_STATUS_DONE);
        assert_eq!(toggled_status("In corso"), TASK_STATUS_DONE);
    }
}
