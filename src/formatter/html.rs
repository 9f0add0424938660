use super::{format_currency, format_miles, format_rate, format_uk_date};
use crate::models::Bill;

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; margin: 0; padding: 0; color: #333; }
    h1, h2, h3 { color: #2980b9; }
    .container { padding: 20px; box-sizing: border-box; }
    .summary { margin-bottom: 30px; background-color: #f8f9fa; padding: 15px; border-radius: 5px; }
    .summary table { width: 100%; margin: 0; border: none; }
    .summary table td { border: none; padding: 8px 15px; }
    .summary table td:first-child { font-weight: bold; width: 150px; }
    table { border-collapse: collapse; width: 100%; margin: 20px 0; }
    th, td { padding: 12px 8px; text-align: left; border: 1px solid #ddd; }
    th { background-color: #2980b9; color: white; }
    tbody tr:nth-child(even) { background-color: #f2f2f2; }
    tfoot { font-weight: bold; background-color: #2980b9; color: white; }
    .footer { margin-top: 30px; font-size: 0.8em; color: #777; text-align: center; border-top: 1px solid #eee; padding-top: 10px; }
"#;

/// HTML 文本转义
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 自包含 HTML 文档 (内联样式, 无外部资源)
pub fn format_as_html(bill: &Bill) -> String {
    let customer = escape_html(&bill.customer_name);

    let rows: String = bill
        .vehicles
        .iter()
        .map(|v| {
            format!(
                "          <tr>\n\
                 \x20           <td>{}</td>\n\
                 \x20           <td>{}</td>\n\
                 \x20           <td>{}</td>\n\
                 \x20           <td>{}</td>\n\
                 \x20           <td>{}</td>\n\
                 \x20           <td>{}</td>\n\
                 \x20           <td>{}</td>\n\
                 \x20           <td>{}</td>\n\
                 \x20         </tr>\n",
                escape_html(&v.license_plate),
                escape_html(&v.vin),
                escape_html(&v.make),
                escape_html(&v.model),
                format_miles(&v.start_odometer_miles),
                format_miles(&v.end_odometer_miles),
                format_miles(&v.miles_travelled),
                format_currency(&v.cost),
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Bill for {customer}</title>
    <style>{style}</style>
  </head>
  <body>
    <div class="container">
      <h1>Vehicle Usage Bill</h1>
      <h2>{customer}</h2>

      <div class="summary">
        <h3>Summary</h3>
        <table>
          <tr><td>Billing Period:</td><td>{start} to {end}</td></tr>
          <tr><td>Total Miles:</td><td>{total_miles}</td></tr>
          <tr><td>Cost Per Mile:</td><td>{rate}</td></tr>
          <tr><td>Total Cost:</td><td>{total_cost}</td></tr>
        </table>
      </div>

      <h3>Vehicle Details</h3>
      <table>
        <thead>
          <tr>
            <th>License Plate</th>
            <th>VIN</th>
            <th>Make</th>
            <th>Model</th>
            <th>Start Odometer</th>
            <th>End Odometer</th>
            <th>Miles</th>
            <th>Cost</th>
          </tr>
        </thead>
        <tbody>
{rows}        </tbody>
        <tfoot>
          <tr>
            <td colspan="6" style="text-align: right;"><strong>Total:</strong></td>
            <td><strong>{total_miles}</strong></td>
            <td><strong>{total_cost}</strong></td>
          </tr>
        </tfoot>
      </table>

      <div class="footer">
        <p>Generated on: {generated}</p>
      </div>
    </div>
  </body>
</html>
"#,
        customer = customer,
        style = STYLE,
        start = format_uk_date(&bill.billing_period_start),
        end = format_uk_date(&bill.billing_period_end),
        total_miles = format_miles(&bill.total_miles),
        rate = format_rate(&bill.cost_per_mile),
        total_cost = format_currency(&bill.total_cost),
        rows = rows,
        generated = format_uk_date(&bill.generated_at),
    )
}
