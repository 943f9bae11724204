use comfy_table::{Cell, Table};

use crate::error::{NetMeterError, Result};
use crate::settings::{load_settings, save_settings, settings_path};

pub fn show() -> Result<()> {
    let settings = load_settings();
    println!("Settings:      {}", settings_path().display());
    println!("Export dir:    {}", settings.export_path().display());
    println!("Utility:       {}", settings.utility_name);
    println!("Info URL:      {}", settings.info_url);
    println!("Phone:         {}", settings.phone);
    println!("Email:         {}", settings.email);

    let mut table = Table::new();
    table.set_header(vec!["Fiscal Year", "Compensation Rate"]);
    for rate in &settings.compensation_rates {
        table.add_row(vec![
            Cell::new(rate.fiscal_year),
            Cell::new(format!("{:.4} $/kWh", rate.rate)),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn set(
    export_dir: Option<String>,
    utility_name: Option<String>,
    info_url: Option<String>,
    phone: Option<String>,
    email: Option<String>,
) -> Result<()> {
    let mut settings = load_settings();
    let mut changed = false;
    for (field, value) in [
        (&mut settings.export_dir, export_dir),
        (&mut settings.utility_name, utility_name),
        (&mut settings.info_url, info_url),
        (&mut settings.phone, phone),
        (&mut settings.email, email),
    ] {
        if let Some(v) = value {
            *field = v;
            changed = true;
        }
    }
    if !changed {
        return Err(NetMeterError::Settings(
            "nothing to change; pass at least one option".to_string(),
        ));
    }
    save_settings(&settings)?;
    println!("Saved {}", settings_path().display());
    Ok(())
}

pub fn rate(year: i32, rate: f64) -> Result<()> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(NetMeterError::Settings(format!("invalid rate: {rate}")));
    }
    let mut settings = load_settings();
    settings.set_rate(year, rate);
    save_settings(&settings)?;
    println!("Fiscal year {year}: {rate:.4} $/kWh");
    Ok(())
}
