use super::{format_miles, format_uk_date};
use crate::models::Bill;
use crate::service::calculator::{round2, round_half_up};
use ::csv::{Terminator, WriterBuilder};

const COLUMNS: [&str; 8] = [
    "License Plate",
    "VIN",
    "Make",
    "Model",
    "Start Odometer (miles)",
    "End Odometer (miles)",
    "Miles Travelled",
    "Cost (GBP)",
];

/// 将一组记录写成 CSV 文本 (`\n` 结尾)
fn write_block(records: &[Vec<String>]) -> String {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for record in records {
        if let Err(e) = writer.write_record(record) {
            tracing::error!("Failed to write CSV record: {}", e);
        }
    }

    match writer.into_inner() {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::error!("Failed to flush CSV writer: {}", e);
            String::new()
        }
    }
}

fn row(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

/// CSV: 汇总块 + 空行 + 表头 + 每车一行 + 生成时间
pub fn format_as_csv(bill: &Bill) -> String {
    let period = format!(
        "{} to {}",
        format_uk_date(&bill.billing_period_start),
        format_uk_date(&bill.billing_period_end)
    );
    let summary = vec![
        row(&["Customer", bill.customer_name.as_str()]),
        row(&["Billing Period", period.as_str()]),
        row(&["Total Miles", format_miles(&bill.total_miles).as_str()]),
        row(&[
            "Cost Per Mile (GBP)",
            round_half_up(&bill.cost_per_mile, 3).to_string().as_str(),
        ]),
        row(&["Total Cost (GBP)", round2(&bill.total_cost).to_string().as_str()]),
    ];

    let mut table = vec![row(&COLUMNS)];
    for v in &bill.vehicles {
        table.push(vec![
            v.license_plate.clone(),
            v.vin.clone(),
            v.make.clone(),
            v.model.clone(),
            format_miles(&v.start_odometer_miles),
            format_miles(&v.end_odometer_miles),
            format_miles(&v.miles_travelled),
            round2(&v.cost).to_string(),
        ]);
    }
    table.push(row(&[
        "Generated on",
        format_uk_date(&bill.generated_at).as_str(),
    ]));

    format!("{}\n{}", write_block(&summary), write_block(&table))
}
