use serde_json::Value;

/// Fixed text sent by the `/debug` route.
pub const DEBUG_MESSAGE: &str = "debug sans json OK";

const FALLBACK_NAME: &str = "Service Inconnu";
const FALLBACK_STATUS: &str = "INCONNU";
const FALLBACK_MSG: &str = "Pas de message détaillé.";

/// Turn an Uptime Kuma webhook payload into the notification text.
///
/// Every field is optional and has a fallback, so any JSON document produces
/// a message. Pure and synchronous, no I/O.
pub fn format_alert(payload: &Value) -> String {
    let name = payload
        .pointer("/monitor/name")
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_NAME);

    // Kuma usually sends a string status, but render whatever shows up
    let status = match payload.get("status") {
        None | Some(Value::Null) => FALLBACK_STATUS.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    let msg = payload
        .get("msg")
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_MSG);

    let mut message = String::from("ALERTE KUMA\n");
    match status.as_str() {
        "down" => message.push_str(&format!(" **{name}** est HORS LIGNE (DOWN) !")),
        "up" => message.push_str(&format!(" **{name}** est de nouveau EN LIGNE (UP).")),
        other => message.push_str(&format!(" Statut mis à jour pour {name}: {other}")),
    }
    message.push_str(&format!("\n\nMessage: {msg}"));

    message
}
