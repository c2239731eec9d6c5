use crate::metrics::{ReportRow, SWAP_MATURITY_PLACEHOLDER};
use anyhow::Result;
use csv::Writer;
use std::{io::Write, path::Path};
use tracing::info;

pub const REPORT_HEADER: [&str; 9] = [
    "PeerAlias",
    "LocalBalance",
    "#Forwards",
    "TotalFeesEarnt",
    "Age(Days)",
    "Fees/Days",
    "Fees/Days Sats",
    "Open",
    "Swap Maturity",
];

pub fn write_report(path: &Path, rows: &[ReportRow]) -> Result<()> {
    info!("Writing {}", path.display());
    let writer = Writer::from_path(path)?;
    write_rows(writer, rows)?;
    info!("Report successfully generated and saved to {}", path.display());
    Ok(())
}

pub fn write_rows<W: Write>(mut writer: Writer<W>, rows: &[ReportRow]) -> Result<()> {
    writer.write_record(REPORT_HEADER)?;
    for row in rows {
        writer.write_record([
            row.alias.clone(),
            row.local_balance.to_string(),
            row.forwards.to_string(),
            format!("{:.4}", row.total_fees_earnt),
            format!("{:.4}", row.age_days),
            format!("{:.4}", row.fees_per_day),
            format!("{:.10}", row.fees_per_day_per_balance),
            open_flag(row.is_open).to_string(),
            SWAP_MATURITY_PLACEHOLDER.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn open_flag(is_open: bool) -> &'static str {
    if is_open { "True" } else { "False" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(rows: &[ReportRow]) -> String {
        let mut buffer = Vec::new();
        write_rows(Writer::from_writer(&mut buffer), rows).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_header_only() {
        assert_eq!(
            render(&[]),
            "PeerAlias,LocalBalance,#Forwards,TotalFeesEarnt,Age(Days),Fees/Days,Fees/Days Sats,Open,Swap Maturity\n"
        );
    }

    #[test]
    fn test_row_formatting() {
        let row = ReportRow {
            alias: "Alice".to_string(),
            local_balance: 100_000,
            forwards: 1,
            total_fees_earnt: 5.0,
            age_days: 10.0,
            fees_per_day: 0.5,
            fees_per_day_per_balance: 0.000005,
            is_open: true,
        };
        let output = render(&[row]);
        let line = output.lines().nth(1).unwrap();
        assert_eq!(
            line,
            "Alice,100000,1,5.0000,10.0000,0.5000,0.0000050000,True,null"
        );
    }

    #[test]
    fn test_alias_with_comma_is_quoted() {
        let row = ReportRow {
            alias: "ACINQ, Inc".to_string(),
            local_balance: 0,
            forwards: 0,
            total_fees_earnt: 0.0,
            age_days: 0.0,
            fees_per_day: 0.0,
            fees_per_day_per_balance: 0.0,
            is_open: false,
        };
        let output = render(&[row]);
        assert_eq!(
            output.lines().nth(1).unwrap(),
            "\"ACINQ, Inc\",0,0,0.0000,0.0000,0.0000,0.0000000000,False,null"
        );
    }
}
