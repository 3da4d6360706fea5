use clap::builder::ValueParser;
use domain::base::Ttl;

use crate::dnssec::Nsec3Denial;
use crate::env::Env;
use crate::error::{ensure, Error};
use crate::message::{display_dig_style, StoredName};
use crate::parse::{parse_name, parse_ttl};

#[derive(Clone, Debug, PartialEq, Eq, clap::Args)]
pub struct Denial {
    /// Deny the queried type instead of the name
    #[arg(long)]
    nodata: bool,

    /// The TTL of the NSEC3 records
    #[arg(
        long = "min-ttl",
        value_name = "SECONDS",
        default_value = "30",
        value_parser = ValueParser::new(parse_ttl)
    )]
    min_ttl: Ttl,

    /// The apex of the zone
    #[arg(value_name = "ZONE", value_parser = ValueParser::new(parse_name))]
    zone: StoredName,

    /// The name that was queried
    #[arg(value_name = "QNAME", value_parser = ValueParser::new(parse_name))]
    qname: StoredName,
}

impl Denial {
    pub fn execute(self, env: impl Env) -> Result<(), Error> {
        ensure!(
            self.qname.ends_with(&self.zone),
            "'{}' is not part of zone '{}'",
            self.qname.fmt_with_dot(),
            self.zone.fmt_with_dot()
        );
        let denial = Nsec3Denial::new(self.zone, self.min_ttl)?;
        let records = if self.nodata {
            vec![denial.nodata(&self.qname)]
        } else {
            denial.nxdomain(&self.qname)
        };

        let mut out = env.stdout();
        for record in records {
            writeln!(out, "{}", display_dig_style(&record));
        }
        Ok(())
    }
}
