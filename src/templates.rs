use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

const ADMIN_PAGE: &str = "admin";
const TICKET_EMAIL: &str = "ticket_email";

const ADMIN_PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Tickets</title>
<style>
body { font-family: sans-serif; margin: 2rem; }
table { border-collapse: collapse; width: 100%; margin-bottom: 2rem; }
th, td { border: 1px solid #ccc; padding: 0.4rem 0.6rem; text-align: left; }
th { background: #f3f3f3; }
.scanned { color: #a33; }
.unscanned { color: #3a3; }
img { width: 64px; height: 64px; }
</style>
</head>
<body>
<h1>Tickets</h1>
<p>{{counts.tickets}} issued, {{counts.scanned}} admitted, {{counts.scan_logs}} scan log entries.</p>
<table>
<thead>
<tr><th>ID</th><th>Name</th><th>Email</th><th>Phone</th><th>Type</th><th>Reference</th><th>Status</th><th>Amount</th><th>Admitted</th><th>Created</th><th>Code</th></tr>
</thead>
<tbody>
{{#each tickets}}
<tr>
<td>{{id}}</td><td>{{name}}</td><td>{{email}}</td><td>{{phone}}</td><td>{{ticket_type}}</td>
<td>{{payment_reference}}</td><td>{{payment_status}}</td><td>{{amount}}</td>
<td class="{{#if scanned}}scanned{{else}}unscanned{{/if}}">{{#if scanned}}yes{{else}}no{{/if}}</td>
<td>{{created_at}}</td>
<td><a href="/codes/{{code_file}}"><img src="/codes/{{code_file}}" alt="code for ticket {{id}}"></a></td>
</tr>
{{else}}
<tr><td colspan="11">No tickets yet.</td></tr>
{{/each}}
</tbody>
</table>
<h2>Scan log</h2>
<table>
<thead>
<tr><th>ID</th><th>Ticket</th><th>Name</th><th>Scanned at</th></tr>
</thead>
<tbody>
{{#each scans}}
<tr><td>{{id}}</td><td>{{ticket_id}}</td><td>{{name}}</td><td>{{scanned_at}}</td></tr>
{{else}}
<tr><td colspan="4">No admissions yet.</td></tr>
{{/each}}
</tbody>
</table>
</body>
</html>
"#;

const TICKET_EMAIL_TEMPLATE: &str = r#"<html>
<body>
<p>Hello {{name}},</p>
<p>Thank you for your purchase. Your <strong>{{ticket_type}}</strong> ticket (#{{ticket_id}}) is attached as a QR code.</p>
<p>Present the code at the entrance. It can be used once.</p>
</body>
</html>
"#;

#[derive(Debug, Clone, Serialize)]
pub struct TicketEmailView<'a> {
    pub ticket_id: i64,
    pub name: &'a str,
    pub ticket_type: &'a str,
}

/// Registered HTML templates. Values are HTML-escaped on render.
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_template_string(ADMIN_PAGE, ADMIN_PAGE_TEMPLATE)?;
        registry.register_template_string(TICKET_EMAIL, TICKET_EMAIL_TEMPLATE)?;
        Ok(Self { registry })
    }

    pub fn admin_page<T: Serialize>(&self, view: &T) -> Result<String, RenderError> {
        self.registry.render(ADMIN_PAGE, view)
    }

    pub fn ticket_email(&self, view: &TicketEmailView<'_>) -> Result<String, RenderError> {
        self.registry.render(TICKET_EMAIL, view)
    }
}
