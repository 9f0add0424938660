use super::{format_miles, format_uk_date};
use crate::models::Bill;
use crate::service::calculator::{round2, round_half_up};
use std::fmt::{self, Write};

/// XML 实体转义
pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn format_as_xml(bill: &Bill) -> String {
    let mut xml = String::new();
    if let Err(e) = write_xml(bill, &mut xml) {
        tracing::error!("Failed to write XML document: {}", e);
    }
    xml
}

fn write_xml(bill: &Bill, out: &mut String) -> fmt::Result {
    writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(out, "<bill>")?;
    writeln!(out, "  <customerName>{}</customerName>", escape_xml(&bill.customer_name))?;
    writeln!(out, "  <billingPeriod>")?;
    writeln!(
        out,
        "    <start>{}</start>",
        escape_xml(&format_uk_date(&bill.billing_period_start))
    )?;
    writeln!(
        out,
        "    <end>{}</end>",
        escape_xml(&format_uk_date(&bill.billing_period_end))
    )?;
    writeln!(out, "  </billingPeriod>")?;
    writeln!(out, "  <totalMiles>{}</totalMiles>", format_miles(&bill.total_miles))?;
    // 单价保留 3 位小数, 不带货币符号
    writeln!(
        out,
        "  <costPerMile>{}</costPerMile>",
        round_half_up(&bill.cost_per_mile, 3)
    )?;
    writeln!(out, "  <totalCost>{}</totalCost>", round2(&bill.total_cost))?;
    writeln!(
        out,
        "  <generatedAt>{}</generatedAt>",
        escape_xml(&format_uk_date(&bill.generated_at))
    )?;

    writeln!(out, "  <vehicles>")?;
    for v in &bill.vehicles {
        writeln!(out, "    <vehicle>")?;
        writeln!(out, "      <licensePlate>{}</licensePlate>", escape_xml(&v.license_plate))?;
        writeln!(out, "      <vin>{}</vin>", escape_xml(&v.vin))?;
        writeln!(out, "      <make>{}</make>", escape_xml(&v.make))?;
        writeln!(out, "      <model>{}</model>", escape_xml(&v.model))?;
        writeln!(
            out,
            "      <startOdometerMiles>{}</startOdometerMiles>",
            format_miles(&v.start_odometer_miles)
        )?;
        writeln!(
            out,
            "      <endOdometerMiles>{}</endOdometerMiles>",
            format_miles(&v.end_odometer_miles)
        )?;
        writeln!(
            out,
            "      <milesTravelled>{}</milesTravelled>",
            format_miles(&v.miles_travelled)
        )?;
        writeln!(out, "      <cost>{}</cost>", round2(&v.cost))?;
        writeln!(out, "    </vehicle>")?;
    }
    writeln!(out, "  </vehicles>")?;
    writeln!(out, "</bill>")
}
