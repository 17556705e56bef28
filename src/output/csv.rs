//! CSV output for range and supernet listings.

use super::terminal::{format_field, status_field};
use crate::models::{AddressRange, IpFamily, Supernet};
use crate::processing::{range_rows, RangePrintRow};
use colored::Colorize;
use std::error::Error;

const RANGE_HEADER: &str =
    r#" "cnt",   "status",          "cidr",          "start",            "end",  "hosts",              "name",     "asn",    "org", "remark""#;

const SUPERNET_HEADER: &str =
    r#""name",          "status",     "used/total",    "asn", "remark""#;

/// Print ranges of one family as CSV to stdout, with gap rows between them.
pub fn range_print<F: IpFamily>(ranges: &[AddressRange<F>]) -> Result<(), Box<dyn Error>> {
    log::info!("#Start range_print() {} {} ranges", ranges.len(), F::LABEL);
    let rows = range_rows(ranges)?;
    let gaps = rows.iter().filter(|r| r.j == 0).count();

    println!("{RANGE_HEADER}");
    for row in &rows {
        println!("{}", csv_row(row));
    }
    println!(
        "#{}# {} {} ranges, {gaps} unallocated blocks between them",
        "NOTE".on_blue(),
        ranges.len(),
        F::LABEL
    );
    Ok(())
}

/// Print supernet rollups as CSV to stdout.
pub fn supernet_print(supernets: &[Supernet]) {
    log::info!("#Start supernet_print() {} supernets", supernets.len());
    println!("{SUPERNET_HEADER}");
    for sn in supernets {
        println!("{}", supernet_row(sn));
    }
}

fn csv_row(row: &RangePrintRow) -> String {
    let gap = if row.j == 0 {
        format_field(&row.gap, 10)
    } else {
        status_field(&row.gap, 10)
    };
    format!(
        "{j},{gap},{cidr},{start},{end},{hosts},{name},{asn},{org},{remark}",
        j = format_field(row.j, 6),
        cidr = format_field(&row.cidr, 20),
        start = format_field(&row.start, 16),
        end = format_field(&row.end, 16),
        hosts = format_field(&row.hosts, 8),
        name = format_field(&row.name, 20),
        asn = format_field(&row.asn, 9),
        org = format_field(&row.org, 8),
        remark = format_field(&row.remark, 0),
    )
}

fn supernet_row(sn: &Supernet) -> String {
    format!(
        "{name},{status},{usage},{asn},{remark}",
        name = format_field(&sn.name, 18),
        status = status_field(&sn.status.to_string(), 15),
        usage = format_field(format!("{}/{}", sn.used_ip_count, sn.total_ip_count), 16),
        asn = format_field(format!("AS{}", sn.asn), 9),
        remark = format_field(&sn.remark, 0),
    )
}
