//! Signal chain topology and gain staging.

mod common;

use common::*;
use core_playback::signal::{SignalChain, DEFAULT_BAND_FREQUENCIES};

#[test]
fn default_chain_links_input_bank_output() {
    let device = FakeRenderDevice::new(48000);
    let chain = SignalChain::new(device.clone()).expect("chain");

    assert_eq!(chain.band_count(), DEFAULT_BAND_FREQUENCIES.len());

    // input -> 10 bands -> output, and the output feeds the device.
    let path = device.path_from(chain.input_stage());
    assert_eq!(path.len(), 12);
    let graph = device.graph.lock();
    assert!(graph.output_links.contains(path.last().unwrap()));

    // First band is a low shelf, last a high shelf.
    let first = graph.stages.get(&path[1]).unwrap().filter.unwrap();
    let last = graph.stages.get(&path[10]).unwrap().filter.unwrap();
    assert_eq!(first.shape, bridge_traits::render::FilterShape::LowShelf);
    assert_eq!(last.shape, bridge_traits::render::FilterShape::HighShelf);
    assert_eq!(first.frequency, 31.5);
    assert_eq!(last.frequency, 16000.0);
}

#[test]
fn out_of_range_band_updates_are_a_no_op() {
    let device = FakeRenderDevice::new(48000);
    let chain = SignalChain::new(device.clone()).expect("chain");

    chain.set_band(3, 4.5).expect("in range");
    assert_eq!(chain.band_gains()[3], 4.5);

    // Index past the bank neither errors nor mutates anything.
    chain.set_band(99, -6.0).expect("no-op");
    assert_eq!(chain.band_gains().len(), 10);
    assert!(chain.band_gains().iter().filter(|g| **g != 0.0).count() == 1);
}

#[test]
fn bypass_round_trip_restores_ordering_and_gains() {
    let device = FakeRenderDevice::new(48000);
    let chain = SignalChain::new(device.clone()).expect("chain");

    chain.set_band(0, 3.0).expect("band 0");
    chain.set_band(5, -2.5).expect("band 5");
    chain.set_band(9, 6.0).expect("band 9");

    let path_before = device.path_from(chain.input_stage());
    let gains_before = chain.band_gains();

    chain.set_bypass(true).expect("bypass on");
    assert!(chain.is_bypassed());
    // Bypassed: input connects straight to the output stage.
    let bypass_path = device.path_from(chain.input_stage());
    assert_eq!(bypass_path.len(), 2);

    chain.set_bypass(false).expect("bypass off");
    assert!(!chain.is_bypassed());

    // Exact pre-bypass stage ordering and gain values are restored.
    assert_eq!(device.path_from(chain.input_stage()), path_before);
    assert_eq!(chain.band_gains(), gains_before);
}

#[test]
fn redundant_bypass_flips_do_not_rebuild() {
    let device = FakeRenderDevice::new(48000);
    let chain = SignalChain::new(device.clone()).expect("chain");

    let connections_before = device.graph.lock().connections.len();
    chain.set_bypass(false).expect("already off");
    assert_eq!(device.graph.lock().connections.len(), connections_before);
}

#[test]
fn output_volume_clamps_into_unit_range() {
    let device = FakeRenderDevice::new(48000);
    let chain = SignalChain::new(device.clone()).expect("chain");

    chain.set_volume(0.4).expect("volume");
    assert_eq!(chain.volume(), 0.4);

    chain.set_volume(1.7).expect("above range");
    assert_eq!(chain.volume(), 1.0);

    chain.set_volume(-0.3).expect("below range");
    assert_eq!(chain.volume(), 0.0);

    // The clamped value lands on the output gain stage.
    let path = device.path_from(chain.input_stage());
    let output = *path.last().unwrap();
    assert_eq!(device.graph.lock().stages.get(&output).unwrap().gain, 0.0);
}

#[test]
fn dispose_releases_every_stage() {
    let device = FakeRenderDevice::new(48000);
    let chain = SignalChain::new(device.clone()).expect("chain");
    chain.dispose();

    let graph = device.graph.lock();
    assert!(graph.stages.values().all(|stage| stage.released));
    assert!(graph.output_links.is_empty());

    drop(graph);
    // Mutations after dispose are silent no-ops.
    chain.set_band(0, 3.0).expect("no-op");
    chain.set_bypass(true).expect("no-op");
}
