use structopt::StructOpt;

use std::{collections::HashMap, ffi};

use datefreq::{
    aggregator, cursor, filter, util::files, AndCombiner, Cursor, DateFrequencyMap, MemCursor,
    Range, Result, SeekingScan,
};

mod config;
mod input;

use config::{Config, TomlConfig};

/// Aggregate date frequency records from a text dump, refer to
/// `input.rs` for the format.
#[derive(StructOpt)]
pub struct Opt {
    #[structopt(long = "toml", help = "Location to config file")]
    toml: Option<ffi::OsString>,

    #[structopt(long = "input", help = "text dump of records to aggregate")]
    input: ffi::OsString,

    #[structopt(long = "row", help = "aggregate only records of this row")]
    row: Option<String>,

    #[structopt(long = "combine", help = "combine visibilities into single record")]
    combine: bool,

    #[structopt(long = "datatypes", help = "comma separated list of datatypes to accept")]
    datatypes: Option<String>,

    #[structopt(long = "start", help = "start date, yyyyMMdd, inclusive")]
    start: Option<String>,

    #[structopt(long = "end", help = "end date, yyyyMMdd, inclusive")]
    end: Option<String>,

    #[structopt(long = "max-next", help = "advances tried before seeking")]
    max_next: Option<String>,

    #[structopt(long = "stats", help = "print statistics")]
    stats: bool,
}

fn main() {
    let opts = Opt::from_iter(std::env::args_os());

    let res = handle(opts);
    res.map_err(|e| println!("Error: {}", e)).ok();
}

fn handle(opts: Opt) -> Result<()> {
    let cfg: Config = {
        let loc_toml = files::find_config(opts.toml.clone(), &["dfreq.toml", ".dfreq.toml"]);
        match loc_toml.as_ref() {
            Some(loc_toml) => files::load_toml::<_, TomlConfig>(loc_toml)?.into(),
            None => Config::default(),
        }
    };
    let cfg = update_with_opts(cfg, &opts)?;

    let source: MemCursor = input::load(&opts.input)?.into_iter().collect();
    let range = match opts.row.as_ref() {
        Some(row) => Range::row(row),
        None => Range::all(),
    };

    match cfg.filter.as_ref() {
        Some(fcfg) => {
            let scan = SeekingScan::new(source, fcfg)?;
            let mut agg = aggregator::Aggregator::new(scan, cfg.aggregator.clone(), AndCombiner);
            render(&mut agg, &range)?;
            if opts.stats {
                println!("{:?}", agg.to_stats());
                println!("{:?}", agg.unwrap().to_stats());
            }
        }
        None => {
            let mut agg = aggregator::Aggregator::new(source, cfg.aggregator.clone(), AndCombiner);
            render(&mut agg, &range)?;
            if opts.stats {
                println!("{:?}", agg.to_stats());
            }
        }
    }

    Ok(())
}

// command line options override the config file.
fn update_with_opts(mut cfg: Config, opts: &Opt) -> Result<Config> {
    if opts.combine {
        cfg.aggregator.set_combine_visibilities(true);
    }

    let mut fopts: HashMap<String, String> = HashMap::new();
    if let Some(fcfg) = cfg.filter.as_ref() {
        let dts: Vec<String> = fcfg
            .datatypes
            .iter()
            .map(|dt| String::from_utf8_lossy(dt).to_string())
            .collect();
        fopts.insert("datatypes".to_string(), dts.join(","));
        if let Some(date) = fcfg.start_date.as_ref() {
            fopts.insert("start.date".to_string(), date.clone());
        }
        if let Some(date) = fcfg.end_date.as_ref() {
            fopts.insert("end.date".to_string(), date.clone());
        }
        fopts.insert("max.next.count".to_string(), fcfg.max_next_count.to_string());
    }

    let items = vec![
        ("datatypes", opts.datatypes.as_ref()),
        ("start.date", opts.start.as_ref()),
        ("end.date", opts.end.as_ref()),
        ("max.next.count", opts.max_next.as_ref()),
    ];
    let mut overridden = false;
    for (name, val) in items.into_iter() {
        if let Some(val) = val {
            fopts.insert(name.to_string(), val.clone());
            overridden = true;
        }
    }

    if overridden || cfg.filter.is_some() {
        cfg.filter = Some(filter::Config::from_options(&fopts)?);
    }
    Ok(cfg)
}

fn render<C: Cursor>(agg: &mut C, range: &Range) -> Result<()> {
    for (key, value) in cursor::scan(agg, range)?.into_iter() {
        let map = DateFrequencyMap::deserialize(&value)?;
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            String::from_utf8_lossy(&key.row),
            String::from_utf8_lossy(&key.family),
            String::from_utf8_lossy(&key.qualifier),
            String::from_utf8_lossy(&key.visibility),
            key.timestamp,
            map
        );
    }
    Ok(())
}
