use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};

const EVENTS_PATH: &str = "sample_events.csv";
const DICTIONARY_PATH: &str = "sample_dictionary.csv";
const EVENT_COUNT: usize = 240;

const LOCATIONS: [&str; 5] = ["P-50", "P-52", "P-55", "FPSO Cidade", "Drillship NS-32"];
const TASKS: [&str; 6] = [
    "Lifting operation",
    "Maintenance",
    "Scaffolding",
    "Hot work",
    "Crane operation",
    "Tank cleaning",
];
const RISK_AREAS: [&str; 5] = [
    "Dropped Objects",
    "Process Safety",
    "Working at Height",
    "Confined Space",
    "Energy Isolation",
];
const HUMAN_FACTORS: [&str; 5] = ["Fatigue", "Complacency", "Communication", "Time pressure", "Training"];
const EVENT_TYPES: [&str; 3] = ["Near Miss", "Incident", "Unsafe Condition"];

/// Description fragments; several carry a weak-signal phrase on purpose.
const OPENINGS: [&str; 8] = [
    "A tool was dropped from height striking the deck",
    "Operator reported fatigue after a double shift",
    "Small hydrocarbon leak found at the flange",
    "Permit to work was not signed before the job started",
    "Scaffold plank found loose during inspection",
    "Crew skipped the toolbox talk because of time pressure",
    "Gas detector alarm during tank entry",
    "Isolation lock missing on the pump breaker",
];
const CLOSINGS: [&str; 5] = [
    "no injuries were recorded.",
    "the area was barricaded.",
    "the supervisor stopped the job.",
    "a safety stand-down was held.",
    "the equipment was tagged out.",
];

const DICTIONARY: [(&str, &str); 10] = [
    ("dropped object", "objeto caído"),
    ("fatigue", "fadiga"),
    ("leak", "vazamento"),
    ("permit to work", "permissão de trabalho"),
    ("loose", "solto"),
    ("time pressure", "pressão de tempo"),
    ("gas alarm", "alarme de gás"),
    ("missing lock", "bloqueio ausente"),
    ("shortcut", "atalho"),
    ("housekeeping", "organização"),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).context("invalid start date")?;

    let mut events = csv::Writer::from_path(EVENTS_PATH)
        .with_context(|| format!("creating {EVENTS_PATH}"))?;
    events.write_record([
        "Event ID",
        "Description",
        "Date Occurred",
        "Location",
        "Task / Activity",
        "Risk Area",
        "Event: Human Factors",
        "Event Type",
    ])?;

    let mut rows = 0;
    for i in 0..EVENT_COUNT {
        let id = format!("EV-{:05}", 10_000 + i);
        let description = format!("{}; {}", rng.pick(&OPENINGS), rng.pick(&CLOSINGS));
        let date = start + Duration::days(rng.below(730) as i64);
        let location = rng.pick(&LOCATIONS);
        let task = rng.pick(&TASKS);
        let risk = rng.pick(&RISK_AREAS);
        let kind = rng.pick(&EVENT_TYPES);

        // Some events list more than one human factor: one row each.
        let factors = 1 + usize::from(rng.below(4) == 0);
        for _ in 0..factors {
            let date = date.to_string();
            events.write_record([
                id.as_str(),
                description.as_str(),
                date.as_str(),
                location,
                task,
                risk,
                rng.pick(&HUMAN_FACTORS),
                kind,
            ])?;
            rows += 1;
        }
    }
    events.flush()?;

    let mut dictionary = csv::Writer::from_path(DICTIONARY_PATH)
        .with_context(|| format!("creating {DICTIONARY_PATH}"))?;
    dictionary.write_record(["Term", "Translation"])?;
    for (term, translation) in DICTIONARY {
        dictionary.write_record([term, translation])?;
    }
    dictionary.flush()?;

    println!(
        "Wrote {EVENT_COUNT} events ({rows} rows) to {EVENTS_PATH} and {} terms to {DICTIONARY_PATH}",
        DICTIONARY.len()
    );
    Ok(())
}
