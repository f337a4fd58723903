//! Feed a probed sine wave into a value component and print each redraw.
//!
//! This example shows how to:
//! 1. Pack simulated values into frames with a probe
//! 2. Ingest the frames into a component's store
//! 3. Advance a time slider from the incoming data
//! 4. Render the shown window at a coarser cadence than data arrival
//!
//! Run with: cargo run --example sine_feed

use simviz_stream::{TimeSlider, TimeWindow, ValueComponent, ValueProbe};

fn main() {
    let mut probe = ValueProbe::new("sine", 1);
    let mut component = ValueComponent::new(1, probe.label(), 1, 0.01);
    let mut slider = TimeSlider::new(0.5, 2.0);

    println!("line colour: {}", component.colors()[0]);

    let dt = 0.001;
    for step in 0..3_000u32 {
        let t = step as f64 * dt;
        if let Err(e) = probe.gather(t, &[(std::f64::consts::TAU * t).sin()]) {
            eprintln!("Error packing sample: {e}");
            return;
        }

        // The transport delivers frames every 10 steps.
        if step % 10 == 9 {
            for frame in probe.drain() {
                component.on_message(&frame);
            }
            if let Some(last) = component.last_time() {
                slider.advance(last);
            }
        }

        // Redraw every 250 steps.
        if step % 250 == 249 && component.redraw().is_pending() {
            let frame = component.update(&slider);
            let summary = frame.summaries[0];
            println!(
                "t={:.3}  window=[{:.3}, {:.3})  points={}  latest={:+.3}  mean={:+.3}",
                slider.last_time(),
                slider.first_shown_time(),
                slider.window_end(),
                frame.traces[0].points.len(),
                frame.latest.map_or(f64::NAN, |v| v[0]),
                summary.mean
            );
        }
    }

    println!("stored samples: {}", component.store().len());
}
