use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tms9918a::{Tms9918a, VdpRenderer, PIXELS_X};
use vdp_core::renderer::Renderer;

fn write_register(vdp: &mut Tms9918a, reg: u8, value: u8) {
    vdp.write_addr(value);
    vdp.write_addr(0x80 | reg);
}

fn poke(vdp: &mut Tms9918a, addr: u16, data: &[u8]) {
    vdp.write_addr((addr & 0xFF) as u8);
    vdp.write_addr(0x40 | ((addr >> 8) & 0x3F) as u8);
    for &b in data {
        vdp.write_data(b);
    }
}

/// Graphics I screen with a patterned background and four sprites per line.
fn setup_graphics_i() -> Tms9918a {
    let mut vdp = Tms9918a::new();
    write_register(&mut vdp, 1, 0x40);
    write_register(&mut vdp, 2, 0x00);
    write_register(&mut vdp, 3, 0x10);
    write_register(&mut vdp, 4, 0x01);
    write_register(&mut vdp, 5, 0x20);
    write_register(&mut vdp, 6, 0x03);

    for tile in 0..768u16 {
        poke(&mut vdp, tile, &[(tile & 0xFF) as u8]);
    }
    for i in 0..32u16 {
        poke(&mut vdp, 0x0400 + i, &[0x1F]);
    }
    for i in 0..2048u16 {
        poke(&mut vdp, 0x0800 + i, &[0x5A]);
    }

    poke(&mut vdp, 0x1800, &[0xFF; 8]);
    for slot in 0..4u16 {
        poke(
            &mut vdp,
            0x1000 + slot * 4,
            &[0x40, (slot * 48) as u8, 0, 2],
        );
    }
    poke(&mut vdp, 0x1010, &[0xD0]);

    vdp
}

fn setup_text() -> Tms9918a {
    let mut vdp = Tms9918a::new();
    write_register(&mut vdp, 1, 0x50);
    write_register(&mut vdp, 4, 0x01);
    write_register(&mut vdp, 7, 0xF4);
    for cell in 0..960u16 {
        poke(&mut vdp, cell, &[(cell & 0x7F) as u8]);
    }
    vdp
}

fn bench_scanline(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanline");

    group.bench_function("graphics_i_frame", |b| {
        let mut vdp = setup_graphics_i();
        let mut row = [0u8; PIXELS_X];
        b.iter(|| {
            for y in 0..192 {
                vdp.scanline(y, &mut row);
            }
            black_box(row[0]);
        });
    });

    group.bench_function("text_frame", |b| {
        let mut vdp = setup_text();
        let mut row = [0u8; PIXELS_X];
        b.iter(|| {
            for y in 0..192 {
                vdp.scanline(y, &mut row);
            }
            black_box(row[0]);
        });
    });

    group.finish();
}

fn bench_render_frame(c: &mut Criterion) {
    c.bench_function("render_frame_argb", |b| {
        let mut vdp = setup_graphics_i();
        let mut renderer = VdpRenderer::new();
        b.iter(|| {
            renderer.render_frame(&mut vdp);
            black_box(renderer.get_frame().pixels[0]);
        });
    });
}

criterion_group!(benches, bench_scanline, bench_render_frame);
criterion_main!(benches);
