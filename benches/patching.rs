//! Benchmarks for the scanning and injection passes.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use ilweave::il::{Cursor, Instruction, MethodBody, MoveType};
use ilweave::patch::{replace_literals, HookTable, SubstitutionTable};

const LITERAL: &str = "event:/collect/touch";

/// A synthetic body with `sites` occurrences of the target literal interleaved
/// with decoys.
fn wide_body(sites: usize) -> MethodBody {
    let mut body = MethodBody::new("Collectible", "OnPlayer");
    for index in 0..sites {
        body.push(Instruction::Ldstr(LITERAL.into()));
        body.push(Instruction::Ldarg0);
        body.push(Instruction::Callvirt("Audio::Play".to_string()));
        body.push(Instruction::Ldstr(format!("event:/decoy/{index}").into()));
        body.push(Instruction::Ldarg0);
        body.push(Instruction::Callvirt("Audio::Play".to_string()));
    }
    body.push(Instruction::Ret);
    body
}

fn bench_cursor_scan(c: &mut Criterion) {
    let mut body = wide_body(256);
    c.bench_function("cursor_scan_256_sites", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(&mut body));
            let pattern = ilweave::il::ldstr(LITERAL);
            let mut hits = 0usize;
            while cursor.try_goto_next(MoveType::After, &[&pattern]) {
                hits += 1;
            }
            black_box(hits)
        })
    });
}

fn bench_replace_literals(c: &mut Criterion) {
    let body = wide_body(256);
    let mut table = SubstitutionTable::new();
    table
        .insert(LITERAL, Arc::new(|_, original, _| original))
        .unwrap();

    c.bench_function("replace_literals_256_sites", |b| {
        b.iter(|| {
            let mut working = body.clone();
            let mut hooks = HookTable::default();
            let pass = replace_literals(&mut working, &table, &mut hooks).unwrap();
            black_box((working.len(), pass.sites.len()))
        })
    });
}

criterion_group!(benches, bench_cursor_scan, bench_replace_literals);
criterion_main!(benches);
