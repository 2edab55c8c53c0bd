//! Sample query listing

use crate::samples::SAMPLES;

pub fn run() -> anyhow::Result<()> {
    let width = SAMPLES.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for sample in &SAMPLES {
        println!("{:<width$}  {}", sample.name, sample.title, width = width);
    }
    Ok(())
}
