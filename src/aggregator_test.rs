use arbitrary::Unstructured;
use rand::{prelude::random, rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

use super::*;
use crate::{
    cursor::{self, MemCursor},
    filter::{self, SeekingScan},
    visibility::AndCombiner,
    Error,
};

fn raw(row: &str, dt: &str, date: &str, vis: &str, ts: u64, n: u64) -> (Key, Vec<u8>) {
    let key = Key::new_raw(row, "f", dt, date, vis, ts);
    (key, Frequency::new(n).encode())
}

fn agg(row: &str, dt: &str, vis: &str, ts: u64, entries: &[(&str, u64)]) -> (Key, Vec<u8>) {
    let map: DateFrequencyMap = entries.iter().cloned().collect();
    (Key::new(row, "f", dt, vis, ts), map.serialize())
}

fn aggregate<V>(data: Vec<(Key, Vec<u8>)>, config: Config, v: V) -> Vec<(Key, DateFrequencyMap)>
where
    V: Combiner,
{
    let source: MemCursor = data.into_iter().collect();
    let mut agg = Aggregator::new(source, config, v);
    cursor::scan(&mut agg, &Range::all())
        .unwrap()
        .into_iter()
        .map(|(k, v)| (k, DateFrequencyMap::deserialize(&v).unwrap()))
        .collect()
}

fn combined() -> Config {
    let mut config = Config::new();
    config.set_combine_visibilities(true);
    config
}

#[test]
fn test_config() {
    assert!(!Config::new().combine_visibilities);
    assert!(combined().combine_visibilities);

    let mut opts: HashMap<String, String> = HashMap::new();
    opts.insert("combine.visibilities".to_string(), "TRUE".to_string());
    opts.insert("start.date".to_string(), "20200101".to_string());
    assert_eq!(Config::from_options(&opts).unwrap(), combined());

    assert_eq!(Config::from_options(&HashMap::new()).unwrap(), Config::new());

    opts.insert("combine.visibilities".to_string(), "yes".to_string());
    match Config::from_options(&opts) {
        Err(Error::InvalidConfig(_, _)) => (),
        res => panic!("{:?}", res),
    }

    let cfg: Config = toml::from_str::<TomlConfig>("combine_visibilities = true")
        .unwrap()
        .into();
    assert_eq!(cfg, combined());
    let cfg: Config = toml::from_str::<TomlConfig>("").unwrap().into();
    assert_eq!(cfg, Config::new());
}

#[test]
fn test_aggregate_raw() {
    let data: Vec<(Key, Vec<u8>)> = (1..=4)
        .map(|ts| raw("NAME", "csv", "20200101", "FOO", ts, 1))
        .collect();

    let items = aggregate(data, Config::new(), AndCombiner);
    assert_eq!(items.len(), 1);

    let (key, map) = &items[0];
    assert_eq!(key, &Key::new("NAME", "f", "csv", "FOO", 4));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("20200101"), Some(Frequency::new(4)));
}

#[test]
fn test_aggregate_mixed() {
    let mut data = vec![agg("NAME", "csv", "FOO", 10, &[("20191225", 40), ("20200101", 15)])];
    for ts in 1..=4 {
        data.push(raw("NAME", "csv", "20200101", "FOO", ts, 1));
    }

    let items = aggregate(data, Config::new(), AndCombiner);
    assert_eq!(items.len(), 1);

    let (key, map) = &items[0];
    assert_eq!(key.timestamp, 10);
    let refm: DateFrequencyMap = vec![("20191225", 40), ("20200101", 19)].into_iter().collect();
    assert_eq!(map, &refm);
}

fn three_labels() -> Vec<(Key, Vec<u8>)> {
    vec![
        raw("NAME", "csv", "20200101", "FOO", 3, 1),
        raw("NAME", "csv", "20200102", "FOO", 2, 2),
        raw("NAME", "csv", "20200101", "BAR", 7, 5),
        raw("NAME", "csv", "20200103", "COB", 1, 1),
        raw("NAME", "csv", "20200102", "COB", 4, 3),
    ]
}

#[test]
fn test_aggregate_combined() {
    let items = aggregate(three_labels(), combined(), AndCombiner);
    assert_eq!(items.len(), 1);

    let (key, map) = &items[0];
    assert_eq!(key, &Key::new("NAME", "f", "csv", "BAR&COB&FOO", 7));
    let refm: DateFrequencyMap = vec![("20200101", 6), ("20200102", 5), ("20200103", 1)]
        .into_iter()
        .collect();
    assert_eq!(map, &refm);
}

#[test]
fn test_aggregate_per_visibility() {
    let items = aggregate(three_labels(), Config::new(), AndCombiner);
    let keys: Vec<Key> = items.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(
        keys,
        vec![
            Key::new("NAME", "f", "csv", "BAR", 7),
            Key::new("NAME", "f", "csv", "COB", 4),
            Key::new("NAME", "f", "csv", "FOO", 3),
        ]
    );
    assert_eq!(items[0].1.to_string(), "20200101:5");
    assert_eq!(items[1].1.to_string(), "20200102:3,20200103:1");
    assert_eq!(items[2].1.to_string(), "20200101:1,20200102:2");
}

#[test]
fn test_group_boundaries() {
    let data = vec![
        raw("r1", "cs", "20200101", "", 1, 1),
        raw("r1", "csv", "20200101", "", 1, 1),
        raw("r1", "csv", "20200101", "A", 9, 1),
        raw("r1", "csv", "20200102", "", 3, 1),
        raw("r1", "json", "20200101", "", 1, 1),
        (Key::new_raw("r1", "g", "csv", "20200101", "", 1), vec![1]),
        raw("r2", "csv", "20200101", "", 1, 1),
    ];

    let source: MemCursor = data.into_iter().collect();
    let mut agg = Aggregator::new(source, combined(), AndCombiner);
    let items = cursor::scan(&mut agg, &Range::all()).unwrap();
    let keys: Vec<Key> = items.into_iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![
            Key::new("r1", "f", "cs", "", 1),
            Key::new("r1", "f", "csv", "A", 9),
            Key::new("r1", "f", "json", "", 1),
            Key::new("r1", "g", "csv", "", 1),
            Key::new("r2", "f", "csv", "", 1),
        ]
    );

    let stats = agg.to_stats();
    assert_eq!(stats.n_groups, 5);
    assert_eq!(stats.n_input, 7);
    assert_eq!(stats.n_raw, 7);
    assert_eq!(stats.n_aggregated, 0);
    assert_eq!(stats.n_output, 5);
}

#[test]
fn test_aggregate_errors() {
    // raw value must be exactly one varint.
    let mut data = three_labels();
    data.push((Key::new_raw("NAME", "f", "csv", "20200104", "X", 1), vec![1, 2]));
    let source: MemCursor = data.into_iter().collect();
    let mut agg = Aggregator::new(source, Config::new(), AndCombiner);
    match agg.seek(&Range::all(), &[], false) {
        Err(Error::MalformedEncoding(_, _)) => (),
        res => panic!("{:?}", res),
    }
    assert!(!agg.has_top());
    match agg.advance() {
        Err(Error::Fatal(_, _)) => (),
        res => panic!("{:?}", res),
    }

    let data = vec![(Key::new("NAME", "f", "csv", "", 1), vec![2, 0])];
    let source: MemCursor = data.into_iter().collect();
    let mut agg = Aggregator::new(source, Config::new(), AndCombiner);
    match agg.seek(&Range::all(), &[], false) {
        Err(Error::MalformedEncoding(_, _)) => (),
        res => panic!("{:?}", res),
    }

    let data = vec![(Key::new("NAME", "f", b"csv\x00\xff\xfe", "", 1), vec![1])];
    let source: MemCursor = data.into_iter().collect();
    let mut agg = Aggregator::new(source, Config::new(), AndCombiner);
    match agg.seek(&Range::all(), &[], false) {
        Err(Error::MalformedKey(_, _)) => (),
        res => panic!("{:?}", res),
    }
}

#[test]
fn test_combine_failure() {
    let data = vec![
        raw("NAME", "csv", "20200101", "A&", 1, 1),
        raw("NAME", "csv", "20200101", "B", 1, 1),
    ];

    let source: MemCursor = data.clone().into_iter().collect();
    let mut agg = Aggregator::new(source, combined(), AndCombiner);
    match agg.seek(&Range::all(), &[], false) {
        Err(Error::VisibilityCombine(_, _)) => (),
        res => panic!("{:?}", res),
    }

    let refuse = |_: &[Vec<u8>]| -> Result<Vec<u8>> { err_at!(VisibilityCombine, msg: "refuse") };
    let source: MemCursor = data.clone().into_iter().collect();
    let mut agg = Aggregator::new(source, combined(), refuse);
    match agg.seek(&Range::all(), &[], false) {
        Err(Error::VisibilityCombine(_, _)) => (),
        res => panic!("{:?}", res),
    }

    // combiner is not consulted in per-visibility mode.
    let items = aggregate(data, Config::new(), refuse);
    assert_eq!(items.len(), 2);
}

#[test]
fn test_closure_combiner() {
    let first = |labels: &[Vec<u8>]| -> Result<Vec<u8>> { Ok(labels[0].clone()) };
    let items = aggregate(three_labels(), combined(), first);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].0.visibility, b"BAR".to_vec());
    assert_eq!(items[0].1.total(), 12);
}

#[test]
fn test_seek_range() {
    let data = vec![
        raw("r1", "csv", "20200101", "", 1, 1),
        raw("r2", "csv", "20200101", "", 10, 1),
        raw("r2", "csv", "20200101", "", 5, 1),
        raw("r2", "csv", "20200102", "", 5, 1),
        raw("r2", "json", "20200101", "", 5, 1),
        raw("r3", "csv", "20200101", "", 1, 1),
    ];
    let source: MemCursor = data.into_iter().collect();
    let mut agg = Aggregator::new(source, Config::new(), AndCombiner);

    // start key is widened to the newest version of its cell.
    let start = Key::new_raw("r2", "f", "csv", "20200101", "", 5);
    let end = Key::first_of("r2", "f", "json");
    let items = cursor::scan(&mut agg, &Range::new(start..end)).unwrap();
    assert_eq!(items.len(), 1);
    let map = DateFrequencyMap::deserialize(&items[0].1).unwrap();
    assert_eq!(map.to_string(), "20200101:2,20200102:1");
    assert_eq!(items[0].0.timestamp, 10);

    let items = cursor::scan(&mut agg, &Range::row("r2")).unwrap();
    assert_eq!(items.len(), 2);

    agg.seek(&Range::all(), &[b"f".to_vec()], false).unwrap();
    assert!(!agg.has_top());
    assert_eq!(agg.top_key(), None);
    assert_eq!(agg.top_value(), None);

    let items = cursor::scan(&mut agg, &Range::all()).unwrap();
    assert_eq!(items.len(), 4);
}

#[test]
fn test_fork() {
    let items = aggregate(three_labels(), Config::new(), AndCombiner);

    let mut data = three_labels();
    data.push(raw("NAME", "json", "20200101", "", 1, 1));
    let source: MemCursor = data.into_iter().collect();
    let mut agg = Aggregator::new(source, Config::new(), AndCombiner);
    agg.seek(&Range::all(), &[], false).unwrap();
    agg.advance().unwrap();

    // fork carries the buffered output and the current top.
    let fork = agg.fork().unwrap();
    assert_eq!(fork.top_key(), Some(&items[1].0));
    let rest: Vec<Key> = cursor::Entries::new(fork).map(|e| e.unwrap().0).collect();
    assert_eq!(rest.len(), 3);
    assert_eq!(rest[1], items[2].0);
    assert_eq!(rest[2], Key::new("NAME", "f", "json", "", 1));

    let rest: Vec<Key> = cursor::Entries::new(agg).map(|e| e.unwrap().0).collect();
    assert_eq!(rest.len(), 3);
}

#[test]
fn test_pipeline() {
    let mut data = vec![];
    for day in 1..=9 {
        for dt in ["csv", "json", "xml"].iter() {
            data.push(raw("NAME", dt, &format!("2024050{}", day), "FOO", day, day));
        }
    }

    let mut fconfig = filter::Config::new("20240503", "20240505");
    fconfig.set_datatypes(&["csv", "xml"]);

    let source: MemCursor = data.into_iter().collect();
    let scan = SeekingScan::new(source, &fconfig).unwrap();
    let mut agg = Aggregator::new(scan, Config::new(), AndCombiner);

    let items = cursor::scan(&mut agg, &Range::all()).unwrap();
    let items: Vec<(Key, String)> = items
        .into_iter()
        .map(|(k, v)| (k, DateFrequencyMap::deserialize(&v).unwrap().to_string()))
        .collect();
    assert_eq!(
        items,
        vec![
            (
                Key::new("NAME", "f", "csv", "FOO", 5),
                "20240503:3,20240504:4,20240505:5".to_string()
            ),
            (
                Key::new("NAME", "f", "xml", "FOO", 5),
                "20240503:3,20240504:4,20240505:5".to_string()
            ),
        ]
    );

    let scan = agg.unwrap();
    assert_eq!(scan.to_stats().n_accepted, 6);
}

// records keyed by (row, datatype, visibility), mixing raw and aggregated
// forms, along with the expected per-visibility output.
fn random_data(
    rng: &mut SmallRng,
    uns: &mut Unstructured,
) -> (Vec<(Key, Vec<u8>)>, BTreeMap<Key, DateFrequencyMap>) {
    let rows = ["r1", "r2", "r3"];
    let dtypes = ["a", "ab", "b"];
    let labels = ["", "X", "Y&Z"];

    let mut data: BTreeMap<Key, Vec<u8>> = BTreeMap::new();
    for _ in 0..(rng.gen::<usize>() % 200) {
        let row = rows.choose(rng).unwrap();
        let dt = dtypes.choose(rng).unwrap();
        let vis = labels.choose(rng).unwrap();
        let ts = rng.gen::<u64>() % 100;
        let (key, value) = if rng.gen::<u8>() % 4 == 0 {
            let map: DateFrequencyMap = uns.arbitrary().unwrap();
            let map: DateFrequencyMap = map
                .entries()
                .map(|(date, freq)| (date, freq.to_value() % 1_000_000))
                .collect();
            (Key::new(row, "f", dt, vis, ts), map.serialize())
        } else {
            let date = format!("202001{:02}", (rng.gen::<u8>() % 28) + 1);
            raw(row, dt, &date, vis, ts, rng.gen::<u64>() % 1000)
        };
        data.insert(key, value);
    }

    let mut refs: BTreeMap<(Key, Vec<u8>), (DateFrequencyMap, u64)> = BTreeMap::new();
    for (key, value) in data.iter() {
        let map = match key.to_qualifier() {
            Qualifier::Raw { date, .. } => {
                let date = std::str::from_utf8(date).unwrap();
                let n = Frequency::from_bytes(value).unwrap().to_value();
                vec![(date, n)].into_iter().collect()
            }
            Qualifier::Aggregated { .. } => DateFrequencyMap::deserialize(value).unwrap(),
        };
        let dtype = key.to_qualifier().as_dtype().to_vec();
        let cell = Key::new(&key.row, &key.family, dtype, b"", 0);
        let entry = refs
            .entry((cell, key.visibility.clone()))
            .or_insert_with(|| (DateFrequencyMap::new(), 0));
        entry.0.increment_all(&map);
        entry.1 = cmp::max(entry.1, key.timestamp);
    }

    let refs = refs
        .into_iter()
        .map(|((cell, vis), (map, ts))| {
            let key = Key::new(cell.row, cell.family, cell.qualifier, vis, ts);
            (key, map)
        })
        .collect();

    (data.into_iter().collect(), refs)
}

#[test]
fn test_aggregate_random() {
    let seed: u64 = random();
    let mut rng = SmallRng::seed_from_u64(seed);
    println!("test_aggregate_random {}", seed);

    let bytes: Vec<u8> = (0..1_000_000).map(|_| rng.gen::<u8>()).collect();
    let mut uns = Unstructured::new(&bytes);

    for _ in 0..50 {
        let (data, refs) = random_data(&mut rng, &mut uns);
        let n = data.len();

        let source: MemCursor = data.clone().into_iter().collect();
        let mut agg = Aggregator::new(source, Config::new(), AndCombiner);
        let items = cursor::scan(&mut agg, &Range::all()).unwrap();
        assert_eq!(agg.to_stats().n_input, n);

        let outs: Vec<(Key, DateFrequencyMap)> = items
            .iter()
            .map(|(k, v)| (k.clone(), DateFrequencyMap::deserialize(v).unwrap()))
            .collect();
        let refs: Vec<(Key, DateFrequencyMap)> = refs.into_iter().collect();
        assert_eq!(outs, refs);

        // re-aggregating aggregated output is idempotent.
        let again = aggregate(items.clone(), Config::new(), AndCombiner);
        assert_eq!(again, refs);

        // combined output is the union of per-visibility output.
        let comb = aggregate(data, combined(), AndCombiner);
        let comb_total: u64 = comb.iter().map(|(_, m)| m.total()).sum();
        let refs_total: u64 = refs.iter().map(|(_, m)| m.total()).sum();
        assert_eq!(comb_total, refs_total);
        assert!(comb.len() <= refs.len());
    }
}
