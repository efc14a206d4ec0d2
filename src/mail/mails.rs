use super::sendmail::OutgoingMail;
use crate::models::{providermodel::Provider, requestmodel::CustomerRequest};

const ADMIN_SUMMARY_TEMPLATE: &str = include_str!("templates/admin-summary.html");
const PROVIDER_NOTICE_TEMPLATE: &str = include_str!("templates/provider-notice.html");
const REQUEST_ACCEPTED_TEMPLATE: &str = include_str!("templates/request-accepted.html");
const REQUEST_REJECTED_TEMPLATE: &str = include_str!("templates/request-rejected.html");

/// Fills `{{key}}` placeholders. Values are escaped; `raw` values are
/// inserted as-is and must already be safe HTML.
fn render(template: &str, values: &[(&str, String)], raw: &[(&str, String)]) -> String {
    let mut html = template.to_string();
    for (key, value) in values {
        html = html.replace(&format!("{{{{{}}}}}", key), &ammonia::clean_text(value));
    }
    for (key, value) in raw {
        html = html.replace(&format!("{{{{{}}}}}", key), value);
    }
    html
}

fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("-")
        .to_string()
}

fn people(request: &CustomerRequest) -> String {
    request
        .people_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn tracking_url(app_url: &str, reference: &str) -> String {
    format!("{}/track?ref={}", app_url, urlencoding::encode(reference))
}

pub fn dashboard_url(app_url: &str) -> String {
    format!("{}/provider/dashboard", app_url)
}

pub fn admin_accept_url(app_url: &str, reference: &str, provider_id: i64) -> String {
    format!(
        "{}/admin/requests/{}/accept?provider_id={}",
        app_url,
        urlencoding::encode(reference),
        provider_id
    )
}

/// Summary for the operations inbox, with one accept link per match.
pub fn admin_summary(
    to: &str,
    bcc: &[String],
    request: &CustomerRequest,
    matches: &[Provider],
    app_url: &str,
) -> OutgoingMail {
    let rows: Vec<String> = matches
        .iter()
        .map(|p| {
            format!(
                r#"<li>{} ({}, {}) <a href="{}">accept on their behalf</a></li>"#,
                ammonia::clean_text(&p.name),
                ammonia::clean_text(&p.phone),
                ammonia::clean_text(&p.city),
                ammonia::clean_text(&admin_accept_url(app_url, &request.reference, p.id)),
            )
        })
        .collect();
    let rows_html = if rows.is_empty() {
        "<li>No eligible providers</li>".to_string()
    } else {
        rows.join("\n    ")
    };

    let text_rows: Vec<String> = matches
        .iter()
        .map(|p| {
            format!(
                "- {} ({}) {}",
                p.name,
                p.phone,
                admin_accept_url(app_url, &request.reference, p.id)
            )
        })
        .collect();

    let text = format!(
        "New request {}\nCustomer: {} / {} / {}\nCity: {}\nService: {}\nMatched providers: {}\n{}",
        request.reference,
        request.name,
        request.phone,
        request.email,
        request.city,
        request.service_type,
        matches.len(),
        text_rows.join("\n"),
    );

    let html = render(
        ADMIN_SUMMARY_TEMPLATE,
        &[
            ("ref", request.reference.clone()),
            ("name", request.name.clone()),
            ("phone", request.phone.clone()),
            ("email", request.email.clone()),
            ("city", request.city.clone()),
            ("service_type", request.service_type.to_string()),
            ("people_count", people(request)),
            ("notes", or_dash(request.notes.as_deref())),
            ("match_count", matches.len().to_string()),
        ],
        &[("provider_rows", rows_html)],
    );

    OutgoingMail {
        to: to.to_string(),
        bcc: bcc.to_vec(),
        subject: format!("New request {} ({}, {})", request.reference, request.city, request.service_type),
        text,
        html,
    }
}

pub fn provider_notice(provider: &Provider, request: &CustomerRequest, app_url: &str) -> OutgoingMail {
    let dashboard = dashboard_url(app_url);
    let text = format!(
        "مرحبا {}\nطلب جديد {} في {} لخدمة {}.\nلوحة التحكم: {}",
        provider.name, request.reference, request.city, request.service_type, dashboard
    );

    let html = render(
        PROVIDER_NOTICE_TEMPLATE,
        &[
            ("provider_name", provider.name.clone()),
            ("ref", request.reference.clone()),
            ("city", request.city.clone()),
            ("service_type", request.service_type.to_string()),
            ("people_count", people(request)),
            ("dashboard_url", dashboard),
        ],
        &[],
    );

    OutgoingMail {
        to: provider.email.clone(),
        bcc: vec![],
        subject: format!("طلب جديد {}", request.reference),
        text,
        html,
    }
}

pub fn request_accepted(request: &CustomerRequest, app_url: &str) -> OutgoingMail {
    let provider_name = or_dash(request.provider_name.as_deref());
    let price = match (&request.price_total, &request.currency) {
        (Some(total), Some(currency)) => format!("{} {}", total, currency),
        (Some(total), None) => total.to_string(),
        _ => "-".to_string(),
    };
    let payment_method = request
        .payment_method
        .map(|m| m.to_str().to_string())
        .unwrap_or_else(|| "-".to_string());
    let tracking = tracking_url(app_url, &request.reference);

    let text = format!(
        "مرحبا {}\nتم قبول طلبك {} من {}.\nالسعر: {}\nنقطة الالتقاء: {}\nطريقة الدفع: {}\nتابع طلبك: {}",
        request.name,
        request.reference,
        provider_name,
        price,
        or_dash(request.meeting_location.as_deref()),
        payment_method,
        tracking
    );

    let html = render(
        REQUEST_ACCEPTED_TEMPLATE,
        &[
            ("name", request.name.clone()),
            ("ref", request.reference.clone()),
            ("provider_name", provider_name),
            ("price", price),
            ("price_notes", or_dash(request.price_notes.as_deref())),
            ("meeting_location", or_dash(request.meeting_location.as_deref())),
            ("payment_method", payment_method),
            ("payment_details", or_dash(request.payment_details.as_deref())),
            ("tracking_url", tracking),
        ],
        &[],
    );

    OutgoingMail {
        to: request.email.clone(),
        bcc: vec![],
        subject: format!("تم قبول طلبك {}", request.reference),
        text,
        html,
    }
}

pub fn request_rejected(request: &CustomerRequest, note: Option<&str>) -> OutgoingMail {
    let note = or_dash(note);
    let text = format!(
        "مرحبا {}\nنعتذر، لم نتمكن من تنفيذ طلبك {}.\n{}",
        request.name, request.reference, note
    );

    let html = render(
        REQUEST_REJECTED_TEMPLATE,
        &[
            ("name", request.name.clone()),
            ("ref", request.reference.clone()),
            ("note", note),
        ],
        &[],
    );

    OutgoingMail {
        to: request.email.clone(),
        bcc: vec![],
        subject: format!("تحديث على طلبك {}", request.reference),
        text,
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_values() {
        let html = render(
            "<p>{{name}}</p>{{rows}}",
            &[("name", "<script>alert(1)</script>".to_string())],
            &[("rows", "<li>ok</li>".to_string())],
        );
        assert!(!html.contains("<script>"));
        assert!(html.contains("<li>ok</li>"));
    }

    #[test]
    fn test_templates_have_no_unfilled_keys_after_render() {
        let html = render(
            REQUEST_REJECTED_TEMPLATE,
            &[
                ("name", "Ali".to_string()),
                ("ref", "KS-ABC234".to_string()),
                ("note", "-".to_string()),
            ],
            &[],
        );
        assert!(!html.contains("{{"));
        assert!(html.contains("KS-ABC234"));
    }

    #[test]
    fn test_tracking_url_encodes_ref() {
        assert_eq!(
            tracking_url("https://kashta.test", "KS-ABC234"),
            "https://kashta.test/track?ref=KS-ABC234"
        );
    }
}
