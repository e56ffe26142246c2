use anyhow::{bail, Result};
use centerline::{decode, graph_distance, DecoderConfig, SampleConfig};
use flexi_logger::Logger;
use log::info;
use std::time::Instant;

// Grid of w x h nodes; every node names its left and upper neighbor as parents.
fn grid_tokens(w: usize, h: usize, jitter: i64) -> Vec<i64> {
    let mut toks = Vec::new();
    for j in 0..h {
        for i in 0..w {
            let idx = (j * w + i) as i64;
            let x = i as i64 * 20 + (idx % 3) * jitter;
            let y = j as i64 * 16;
            toks.extend([x, y, idx]);
            if i > 0 { toks.extend([idx - 1, x - 10, y + 2]); }
            if j > 0 { toks.extend([idx - w as i64, x + 2, y - 8]); }
            toks.push(572);
        }
    }
    toks
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() { return 0.0; }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len()-1)]
}

fn main() -> Result<()> {
    let _logger = Logger::try_with_env_or_str("info")?.start()?;

    let args: Vec<String> = std::env::args().collect();
    let mut width = 6usize;
    let mut height = 6usize;
    let mut depth = 3usize;
    let mut iters = 20usize;
    let mut reseg: Option<f64> = None;
    let mut assert_ms: Option<f64> = None;
    for a in &args[1..] {
        if let Some(val)=a.strip_prefix("--width=") { if let Ok(v)=val.parse() { width=v; } }
        else if let Some(val)=a.strip_prefix("--height=") { if let Ok(v)=val.parse() { height=v; } }
        else if let Some(val)=a.strip_prefix("--depth=") { if let Ok(v)=val.parse() { depth=v; } }
        else if let Some(val)=a.strip_prefix("--iters=") { if let Ok(v)=val.parse() { iters=v; } }
        else if let Some(val)=a.strip_prefix("--reseg=") { if let Ok(v)=val.parse() { reseg=Some(v); } }
        else if let Some(val)=a.strip_prefix("--assert-ms=") { if let Ok(v)=val.parse() { assert_ms=Some(v); } }
    }

    let cfg = DecoderConfig { resegment_distance: reseg, ..Default::default() };
    let samples = SampleConfig::default();
    let truth = decode(&grid_tokens(width, height, 0), &cfg)?;
    let pred_tokens = grid_tokens(width, height, 2);
    info!("grid {}x{}: {} nodes, {} edges", width, height, truth.node_count(), truth.edge_count());

    let mut times_ms: Vec<f64> = Vec::with_capacity(iters);
    let start_all = Instant::now();
    let mut last = None;
    for _ in 0..iters {
        let t0 = Instant::now();
        let pred = decode(&pred_tokens, &cfg)?;
        let d = graph_distance(&truth, &pred, depth, &samples)?;
        times_ms.push(t0.elapsed().as_secs_f64() * 1000.0);
        last = Some(d);
    }
    let dur_all = start_all.elapsed().as_secs_f64() * 1000.0;
    times_ms.sort_by(|a, b| a.total_cmp(b));
    let med = percentile(&times_ms, 0.5);
    let p90 = percentile(&times_ms, 0.9);
    let p99 = percentile(&times_ms, 0.99);
    if let Some(d) = &last { info!("{}", d); }
    println!("width={} height={} depth={} iters={} total_ms={:.3} median_ms={:.4} p90_ms={:.4} p99_ms={:.4}", width, height, depth, iters, dur_all, med, p90, p99);
    if let Some(th) = assert_ms { if med > th { bail!("median {:.4} ms > threshold {:.3} ms", med, th); } }
    Ok(())
}
