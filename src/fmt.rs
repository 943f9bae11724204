use chrono::NaiveDate;

/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative && cents != "0.00" {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Whole kWh print without a fraction: `-150 kWh`, `12.5 kWh`.
pub fn kwh(val: f64) -> String {
    if val.fract() == 0.0 {
        format!("{val:.0} kWh")
    } else {
        format!("{val} kWh")
    }
}

/// Placeholder for projected cells.
pub const MISSING: &str = "-";

pub fn opt_kwh(val: Option<f64>) -> String {
    val.map(kwh).unwrap_or_else(|| MISSING.to_string())
}

pub fn opt_money(val: Option<f64>) -> String {
    val.map(money).unwrap_or_else(|| MISSING.to_string())
}

/// `10/01/2023`
pub fn statement_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// `October 2023`
pub fn month_year(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "$1,234.56");
        assert_eq!(money(-500.00), "-$500.00");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(1000000.99), "$1,000,000.99");
        assert_eq!(money(15.39), "$15.39");
        assert_eq!(money(-0.001), "$0.00");
    }

    #[test]
    fn test_kwh_formatting() {
        assert_eq!(kwh(-150.0), "-150 kWh");
        assert_eq!(kwh(0.0), "0 kWh");
        assert_eq!(kwh(12.5), "12.5 kWh");
        assert_eq!(opt_kwh(None), "-");
        assert_eq!(opt_money(None), "-");
        assert_eq!(opt_money(Some(9.2)), "$9.20");
    }

    #[test]
    fn test_date_formatting() {
        let d = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap();
        assert_eq!(statement_date(d), "10/01/2023");
        assert_eq!(month_year(d), "October 2023");
    }
}
