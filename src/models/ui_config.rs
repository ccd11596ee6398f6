// src/models/ui_config.rs
//
// O documento de configuração da UI é JSON schema-driven: o cliente desenha
// a interface a partir dele. Aqui ficam o documento padrão do processo, a
// validação estrutural e o merge seletivo usado pelos PATCHes e pelo
// AI builder.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

// Uma configuração como vai para o cliente. `id` é None quando o usuário
// ainda não salvou nada e está recebendo o documento padrão.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UiConfigView {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub name: String,
    pub version: Option<String>,
    #[schema(value_type = Object)]
    pub config: Value,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UiConfigView {
    pub fn fallback() -> Self {
        UiConfigView {
            id: None,
            user_id: None,
            name: "default".to_string(),
            version: default_version(),
            config: default_ui_config(),
            is_default: true,
            updated_at: None,
        }
    }
}

pub fn default_version() -> Option<String> {
    default_ui_config()
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string)
}

// Um documento válido precisa de version, theme e pages.
pub fn has_valid_structure(config: &Value) -> bool {
    config.get("version").is_some() && config.get("theme").is_some() && config.get("pages").is_some()
}

// Merge seletivo: só as seções conhecidas são mescladas, campo a campo,
// por cima de uma cópia da base. Seções desconhecidas do delta são
// ignoradas de propósito.
pub fn merge_configs(base: &Value, changes: &Value) -> Value {
    let mut result = base.clone();

    for section in ["theme", "navigation", "dashboard", "quickActions", "globalSettings"] {
        if let Some(delta) = changes.get(section).and_then(Value::as_object) {
            let entry = result
                .as_object_mut()
                .map(|root| root.entry(section).or_insert_with(|| json!({})));
            if let Some(target) = entry.and_then(|v| v.as_object_mut()) {
                for (key, value) in delta {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
    }

    if let Some(home) = changes.get("homePage") {
        if let Some(root) = result.as_object_mut() {
            root.insert("homePage".to_string(), home.clone());
        }
    }

    // As tabelas são mescladas tabela a tabela.
    if let Some(tables) = changes.get("tables").and_then(Value::as_object) {
        let entry = result
            .as_object_mut()
            .map(|root| root.entry("tables").or_insert_with(|| json!({})));
        if let Some(target_tables) = entry.and_then(|v| v.as_object_mut()) {
            for (table, delta) in tables {
                let table_entry = target_tables.entry(table.clone()).or_insert_with(|| json!({}));
                if let (Some(target), Some(delta)) = (table_entry.as_object_mut(), delta.as_object())
                {
                    for (key, value) in delta {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
    }

    result
}

// Resumo em italiano das mudanças aplicadas pelo AI builder, para o
// toast de confirmação no cliente.
pub fn describe_changes(changes: &Value) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(theme) = changes.get("theme") {
        if let Some(mode) = theme.get("mode").and_then(Value::as_str) {
            parts.push(if mode == "dark" { "Tema scuro" } else { "Tema chiaro" }.to_string());
        }
        if let Some(color) = theme.get("primaryColor").and_then(Value::as_str) {
            let color_name = match color {
                "#3b82f6" => "blu",
                "#8b5cf6" => "viola",
                "#10b981" => "verde",
                "#ef4444" => "rosso",
                "#f97316" => "arancione",
                "#ec4899" => "rosa",
                "#6366f1" => "indaco",
                "#14b8a6" => "teal",
                "#eab308" => "giallo",
                "#6b7280" => "grigio",
                "#1e3a5f" => "navy",
                "#0f172a" => "nero",
                other => other,
            };
            parts.push(format!("Colore {color_name}"));
        }
        if let Some(density) = theme.get("density").and_then(Value::as_str) {
            let label = match density {
                "compact" => "compatta",
                "comfortable" => "spaziosa",
                _ => "normale",
            };
            parts.push(format!("Densità {label}"));
        }
        if let Some(radius) = theme.get("borderRadius").and_then(Value::as_str) {
            let label = match radius {
                "none" => "squadrati",
                "small" => "piccoli",
                "large" => "arrotondati",
                _ => "medi",
            };
            parts.push(format!("Bordi {label}"));
        }
        if let Some(size) = theme.get("fontSize").and_then(Value::as_str) {
            let label = match size {
                "small" => "piccolo",
                "large" => "grande",
                _ => "medio",
            };
            parts.push(format!("Testo {label}"));
        }
    }

    if let Some(navigation) = changes.get("navigation") {
        if navigation.get("visibleItems").is_some() {
            parts.push("Menu aggiornato".to_string());
        }
        if let Some(collapsed) = navigation.get("collapsed").and_then(Value::as_bool) {
            parts.push(if collapsed { "Sidebar compressa" } else { "Sidebar espansa" }.to_string());
        }
    }

    if let Some(dashboard) = changes.get("dashboard") {
        if let Some(layout) = dashboard.get("layout").and_then(Value::as_str) {
            let label = match layout {
                "compact" => "compatto",
                "minimal" => "minimale",
                _ => "standard",
            };
            parts.push(format!("Dashboard {label}"));
        }
        if dashboard.get("visibleCards").is_some() {
            parts.push("Card dashboard aggiornate".to_string());
        }
    }

    if let Some(home) = changes.get("homePage").and_then(Value::as_str) {
        let label = match home {
            "dashboard" => "Dashboard",
            "pipeline" => "Pipeline",
            "contacts" => "Contatti",
            "tasks" => "Attività",
            "projects" => "Progetti",
            other => other,
        };
        parts.push(format!("Home: {label}"));
    }

    if parts.is_empty() {
        "Modifiche applicate".to_string()
    } else {
        parts.join(", ")
    }
}

// O documento padrão do processo: a UI completa como nasce de fábrica.
pub fn default_ui_config() -> Value {
    json!({
        "version": "2.0",

        "theme": {
            "mode": "light",
            "primaryColor": "#6366f1",
            "accentColor": "#8b5cf6",
            "borderRadius": "medium",
            "density": "normal",
            "fontSize": "medium",
            "fontFamily": "system"
        },

        "navigation": {
            "position": "sidebar",
            "collapsed": false,
            "showLabels": true,
            "showIcons": true,
            "visibleItems": ["dashboard", "pipeline", "contacts", "opportunities", "projects", "tasks", "invoices", "calendar", "settings"]
        },

        "homePage": "dashboard",

        "dashboard": {
            "layout": "default",
            "visibleCards": ["kpi", "forfettario", "activities", "pipeline-mini"],
            "cardOrder": ["kpi", "forfettario", "activities", "pipeline-mini"],
            "kpiCards": ["revenue", "pipeline", "contacts", "tasks"]
        },

        "tables": {
            "contacts": {
                "visibleColumns": ["name", "company", "email", "phone", "type", "value"],
                "sortBy": "name",
                "sortOrder": "asc"
            },
            "opportunities": {
                "visibleColumns": ["title", "company", "value", "stage", "probability", "closeDate"],
                "sortBy": "value",
                "sortOrder": "desc"
            },
            "tasks": {
                "visibleColumns": ["title", "dueDate", "priority", "status", "contact"],
                "sortBy": "dueDate",
                "sortOrder": "asc"
            },
            "invoices": {
                "visibleColumns": ["number", "client", "amount", "status", "dueDate"],
                "sortBy": "dueDate",
                "sortOrder": "desc"
            }
        },

        "quickActions": {
            "enabled": true,
            "items": ["add-contact", "add-task", "add-opportunity"]
        },

        "pages": {
            "dashboard": {
                "id": "dashboard",
                "name": "Dashboard",
                "icon": "LayoutDashboard",
                "visible": true,
                "order": 1,
                "sections": [
                    { "id": "kpi-row", "type": "stats-row", "visible": true, "order": 1, "config": { "stats": ["revenue", "pipeline", "contacts", "tasks"] } },
                    { "id": "forfettario-tracker", "type": "progress-card", "title": "Stato Forfettario", "visible": true, "order": 2, "config": { "showLimit": true, "limit": 85000 } },
                    { "id": "recent-activities", "type": "list", "title": "Attivita Recenti", "visible": true, "order": 3, "dataSource": "tasks", "config": { "limit": 5, "filter": "upcoming" } }
                ]
            },
            "pipeline": {
                "id": "pipeline",
                "name": "Pipeline",
                "icon": "TrendingUp",
                "visible": true,
                "order": 2,
                "sections": [
                    { "id": "pipeline-kanban", "type": "kanban", "visible": true, "order": 1, "dataSource": "opportunities", "config": { "stages": ["Lead", "Contatto", "Proposta", "Negoziazione", "Vinto", "Perso"], "showValue": true } }
                ]
            },
            "contacts": {
                "id": "contacts",
                "name": "Contatti",
                "icon": "Users",
                "visible": true,
                "order": 3,
                "sections": [
                    { "id": "contacts-kpi", "type": "stats-row", "visible": true, "order": 1, "config": { "stats": ["total", "clients", "prospects", "value"] } },
                    { "id": "contacts-grid", "type": "card-grid", "visible": true, "order": 2, "dataSource": "contacts", "config": { "showAvatar": true, "showValue": true } }
                ]
            },
            "opportunities": {
                "id": "opportunities",
                "name": "Opportunita",
                "icon": "Briefcase",
                "visible": true,
                "order": 4,
                "sections": [
                    { "id": "opportunities-table", "type": "table", "visible": true, "order": 1, "dataSource": "opportunities", "config": { "columns": ["title", "company", "value", "stage", "probability", "closeDate"] } }
                ]
            },
            "projects": {
                "id": "projects",
                "name": "Progetti",
                "icon": "FolderKanban",
                "visible": true,
                "order": 5,
                "sections": [
                    { "id": "projects-kanban", "type": "kanban", "visible": true, "order": 1, "dataSource": "projects", "config": { "stages": ["in_lavorazione", "in_revisione", "consegnato", "chiuso"] } }
                ]
            },
            "tasks": {
                "id": "tasks",
                "name": "Attivita",
                "icon": "CheckSquare",
                "visible": true,
                "order": 6,
                "sections": [
                    { "id": "tasks-list", "type": "task-list", "visible": true, "order": 1, "dataSource": "tasks", "config": { "groupBy": "status", "showPriority": true } }
                ]
            },
            "invoices": {
                "id": "invoices",
                "name": "Fatture",
                "icon": "Receipt",
                "visible": true,
                "order": 7,
                "sections": [
                    { "id": "invoices-kanban", "type": "kanban", "visible": true, "order": 1, "dataSource": "invoices", "config": { "stages": ["da_emettere", "emessa", "inviata", "pagata"] } }
                ]
            },
            "calendar": {
                "id": "calendar",
                "name": "Calendario",
                "icon": "Calendar",
                "visible": true,
                "order": 8,
                "sections": [
                    { "id": "calendar-view", "type": "calendar", "visible": true, "order": 1, "dataSource": "tasks", "config": { "defaultView": "month" } }
                ]
            },
            "settings": {
                "id": "settings",
                "name": "Impostazioni",
                "icon": "Settings",
                "visible": true,
                "order": 99,
                "sections": []
            }
        },

        "globalSettings": {
            "dateFormat": "DD/MM/YYYY",
            "currency": "EUR",
            "language": "it",
            "forfettarioLimit": 85000,
            "showAIChat": true
        }
    })
}

// ============================================================================
// PAYLOADS DE ESCRITA
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UiConfigPayload {
    pub name: Option<String>,
    pub version: Option<String>,
    #[schema(value_type = Object)]
    pub config: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ThemePayload {
    #[schema(value_type = Object)]
    pub theme: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct VisibilityPayload {
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiGeneratePayload {
    pub prompt: Option<String>,
    // O cliente manda a configuração que está usando; sem ela, parte-se
    // do documento padrão.
    #[schema(value_type = Object)]
    pub current_config: Option<Value>,
}

// ============================================================================
// TESTES
// ============================================================================
