use handlebars::Handlebars;
use std::sync::Arc;

pub type Hbs = Arc<Handlebars<'static>>;

pub const ALERT_EMAIL: &str = "emails/alert_triggered";

const ALERT_EMAIL_TEMPLATE: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #10b981;">Price Alert Triggered!</h2>
  <p>Your alert for <strong>{{asset}}</strong> has been triggered!</p>
  <div style="background: #f3f4f6; padding: 20px; border-radius: 10px; margin: 20px 0;">
    <p style="margin: 5px 0;"><strong>Condition:</strong> Price goes {{condition}}</p>
    <p style="margin: 5px 0;"><strong>Target Price:</strong> ${{target_price}}</p>
    <p style="margin: 5px 0;"><strong>Current Price:</strong> ${{current_price}}</p>
  </div>
  <p style="color: #6b7280; font-size: 14px;">
    Check your dashboard for more details.
  </p>
</div>
"#;

pub fn build_handlebars() -> Hbs {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);

    // embedded, nothing is read from disk
    hb.register_template_string(ALERT_EMAIL, ALERT_EMAIL_TEMPLATE)
        .expect("template emails/alert_triggered");

    Arc::new(hb)
}
