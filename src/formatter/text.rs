use super::{format_currency, format_miles, format_rate, format_uk_date};
use crate::models::Bill;

const BANNER: &str = "=================";
const SEPARATOR: &str = "-------------------------------";

/// 定宽纯文本报表
pub fn format_as_text(bill: &Bill) -> String {
    let mut text = format!(
        "VEHICLE USAGE BILL\n\
         {BANNER}\n\
         {customer}\n\
         {BANNER}\n\
         \n\
         SUMMARY:\n\
         Total Miles: {total_miles}\n\
         Total Cost: {total_cost}\n\
         Billing Period: {start} to {end}\n\
         Cost Per Mile: {rate}\n\
         \n\
         VEHICLE DETAILS:\n",
        customer = bill.customer_name,
        total_miles = format_miles(&bill.total_miles),
        total_cost = format_currency(&bill.total_cost),
        start = format_uk_date(&bill.billing_period_start),
        end = format_uk_date(&bill.billing_period_end),
        rate = format_rate(&bill.cost_per_mile),
    );

    for v in &bill.vehicles {
        text.push_str(&format!(
            "\n{SEPARATOR}\n\
             License Plate: {plate}\n\
             VIN: {vin}\n\
             Make/Model: {make} {model}\n\
             Start Odometer: {start} miles\n\
             End Odometer: {end} miles\n\
             Miles Travelled: {miles} miles\n\
             Cost: {cost}\n\
             {SEPARATOR}\n",
            plate = v.license_plate,
            vin = v.vin,
            make = v.make,
            model = v.model,
            start = format_miles(&v.start_odometer_miles),
            end = format_miles(&v.end_odometer_miles),
            miles = format_miles(&v.miles_travelled),
            cost = format_currency(&v.cost),
        ));
    }

    text.push_str(&format!(
        "\nGenerated on: {}\n",
        format_uk_date(&bill.generated_at)
    ));
    text
}
