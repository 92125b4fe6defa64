//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Benchmarks for the bridge data path

use chrono::Local;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use modembridge_service::{BridgeContext, Direction, Settings, TelnetSession, format_line};
use std::hint::black_box;

fn telnet_input(len: usize) -> Vec<u8> {
    // Text with an option negotiation and an escaped 0xFF every 64 bytes.
    let mut data = Vec::with_capacity(len + len / 8);
    for i in 0..len {
        if i % 64 == 0 {
            data.extend_from_slice(&[0xFF, 0xFD, 0x03, 0xFF, 0xFF]);
        } else {
            data.push(b'a' + (i % 26) as u8);
        }
    }
    data
}

fn bench_session_process_input(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_process_input");
    let input = telnet_input(4096);
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("4k_with_iac", |b| {
        let mut session = TelnetSession::new(true);
        b.iter(|| black_box(session.process_input(black_box(&input))))
    });
    group.finish();
}

fn bench_data_log_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_log");
    let now = Local::now();
    let chunk: Vec<u8> = (0u8..16).collect();
    group.throughput(Throughput::Bytes(chunk.len() as u64));
    group.bench_function("format_line", |b| {
        let mut out = String::with_capacity(128);
        b.iter(|| {
            out.clear();
            format_line(&mut out, &now, Direction::SerialToTelnet, black_box(&chunk));
            black_box(out.len())
        })
    });
    group.finish();
}

fn bench_context_buffers(c: &mut Criterion) {
    let mut group = c.benchmark_group("context_buffers");
    let ctx = BridgeContext::new(Settings::default());
    let data = vec![0x42u8; 1024];
    let mut out = vec![0u8; 1024];
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("serial_to_telnet_1k", |b| {
        b.iter(|| {
            ctx.serial_to_telnet().write(black_box(&data));
            black_box(ctx.serial_to_telnet().read(&mut out))
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_session_process_input,
    bench_data_log_format,
    bench_context_buffers
);
criterion_main!(benches);
