//! Allocator and address-map micro-benchmark.
//!
//! Measures the per-client hot paths:
//! - claim + release of a free pin
//! - refused claim of an owned pin
//! - register resolution by module type
//! - descriptor build of a full carrier board

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use leaflet_bsp::address_map::{AddressMapBuilder, DescriptorRow};
use leaflet_bsp::allocator::PinAllocator;
use leaflet_bsp::presence::PresenceSnapshot;
use leaflet_common::prelude::*;

fn populated_allocator() -> PinAllocator {
    let allocator = PinAllocator::new();
    allocator.update_presence(
        PresenceSnapshot::default()
            .with_bits(ModuleType::Rel, 0b1111)
            .with_bits(ModuleType::Tmp, 0b111),
    );
    allocator
}

/// Four relay modules with 16 relays, three temperature modules with 8 inputs.
fn board_rows() -> Vec<DescriptorRow> {
    let mut rows: Vec<DescriptorRow> = vec![
        "Modbus Offset,Modul Typ,ModulNr,Mreg,Modul Typ,ModulNr,Mreg,Modul Typ,ModulNr,Mreg"
            .split(',')
            .map(String::from)
            .collect(),
        vec!["Version 0.78".to_string()],
    ];
    let mut address = 0u16;
    for module in 1..=4u8 {
        for position in 1..=16u8 {
            rows.push(
                format!("{address},REL,{module},{position}")
                    .split(',')
                    .map(String::from)
                    .collect(),
            );
            address += 1;
        }
    }
    for module in 1..=3u8 {
        for position in 1..=8u8 {
            rows.push(
                format!("{address},,,,,,,TMP,{module},{position}")
                    .split(',')
                    .map(String::from)
                    .collect(),
            );
            address += 1;
        }
    }
    rows
}

fn bench_claim_release(c: &mut Criterion) {
    let allocator = populated_allocator();
    let pin = PinIdentity::new(ModuleType::Rel, 2, 7);

    c.bench_function("claim_release_free_pin", |b| {
        b.iter(|| {
            allocator.claim(black_box(pin), "relay0").ok();
            allocator.release_owned(black_box(pin), "relay0");
        })
    });
}

fn bench_claim_conflict(c: &mut Criterion) {
    let allocator = populated_allocator();
    let pin = PinIdentity::new(ModuleType::Rel, 1, 1);
    allocator.claim(pin, "relay0").ok();

    c.bench_function("claim_conflict", |b| {
        b.iter(|| allocator.claim(black_box(pin), "relay1").is_err())
    });
}

fn bench_resolve(c: &mut Criterion) {
    let map = AddressMapBuilder::default()
        .build(&board_rows())
        .expect("benchmark descriptor must build");
    let pin = PinIdentity::new(ModuleType::Tmp, 3, 5);

    c.bench_function("resolve_for_type", |b| {
        b.iter(|| map.resolve_for_type(black_box(pin)))
    });
}

fn bench_build(c: &mut Criterion) {
    let rows = board_rows();
    let builder = AddressMapBuilder::default();

    c.bench_function("build_address_map_full_board", |b| {
        b.iter(|| builder.build(black_box(&rows)))
    });
}

criterion_group!(
    benches,
    bench_claim_release,
    bench_claim_conflict,
    bench_resolve,
    bench_build
);
criterion_main!(benches);
