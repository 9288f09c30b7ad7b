use planeview::{ConversionMatrix, ScalarCoefficients};

// Mid-range samples: far from the saturation edges, where truncation in the
// scalar path and rounding in the matrix path can only drift a couple of steps.
const SAMPLES: [(u8, u8, u8); 5] = [
    (128, 128, 128),
    (60, 100, 140),
    (90, 120, 130),
    (120, 110, 150),
    (180, 150, 110),
];

fn assert_close(a: [u8; 4], b: [u8; 4], ctx: &str) {
    for ch in 0..3 {
        let d = (i16::from(a[ch]) - i16::from(b[ch])).abs();
        assert!(
            d <= 2,
            "{ctx}: channel {ch} differs by {d} ({a:?} vs {b:?})"
        );
    }
}

#[test]
fn matrix_and_scalar_paths_agree() {
    for (y, u, v) in SAMPLES {
        let scalar = ScalarCoefficients::BT601.convert(y, u, v);
        let matrix = ConversionMatrix::BT601.shade_u8(y, u, v);
        assert_close(scalar, matrix, &format!("yuv({y},{u},{v})"));
        assert_eq!(scalar[3], 255);
        assert_eq!(matrix[3], 255);
    }
}

#[test]
fn known_samples_convert_exactly() {
    let c = ScalarCoefficients::BT601;
    assert_eq!(c.convert(100, 90, 160), [148, 85, 20, 255]);
    assert_eq!(c.convert(60, 100, 140), [70, 52, 0, 255]);
    assert_eq!(c.convert(180, 150, 110), [161, 196, 234, 255]);
}

#[cfg(feature = "gpu")]
mod parity {
    use planeview::{
        BackendKind, Canvas, FrameDims, I420Frame, RenderSettings, Renderer, create_renderer,
    };

    use super::{SAMPLES, assert_close};

    #[test]
    fn cpu_and_gpu_agree_on_uniform_frames() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let (w, h) = (32u32, 32u32);
        let dims = FrameDims::new(w, h).unwrap();
        let settings = RenderSettings::default();

        let mut cpu_canvas = Canvas::new(w, h);
        let mut gpu_canvas = Canvas::new(w, h);
        let mut cpu = create_renderer(BackendKind::Cpu, &settings);
        let mut gpu = create_renderer(BackendKind::Gpu, &settings);

        cpu.initialize(&mut cpu_canvas, w, h).unwrap();
        match gpu.initialize(&mut gpu_canvas, w, h) {
            Ok(()) => {}
            Err(e) if e.to_string().contains("no gpu adapter available") => return,
            Err(e) => panic!("unexpected gpu init error: {e}"),
        }
        assert!(cpu.produces_alpha_channel());
        assert!(!gpu.produces_alpha_channel());

        for (y, u, v) in SAMPLES {
            let f = I420Frame::filled(dims, y, u, v);
            cpu.render_frame(&f.y, &f.u, &f.v).unwrap();
            gpu.render_frame(&f.y, &f.u, &f.v).unwrap();

            let a = cpu.surface().unwrap().data();
            let b = gpu.surface().unwrap().data();
            assert_eq!(a.len(), b.len());
            for (i, (pa, pb)) in a.chunks_exact(4).zip(b.chunks_exact(4)).enumerate() {
                assert_close(
                    [pa[0], pa[1], pa[2], pa[3]],
                    [pb[0], pb[1], pb[2], pb[3]],
                    &format!("yuv({y},{u},{v}) pixel {i}"),
                );
            }
        }
    }

    // Luma varies per pixel, chroma is constant. Linear filtering and the
    // slight quad overscan blend each luma texel with a sliver of its
    // neighbours, so the bound is one step looser than for uniform frames.
    #[test]
    fn cpu_and_gpu_agree_on_varied_luma() {
        let (w, h) = (4u32, 4u32);
        let y: Vec<u8> = (0..16u8).map(|i| 60 + i * 10).collect();
        let u = vec![128u8; 4];
        let v = vec![128u8; 4];

        let settings = RenderSettings::default();
        let mut cpu_canvas = Canvas::new(w, h);
        let mut gpu_canvas = Canvas::new(w, h);
        let mut cpu = create_renderer(BackendKind::Cpu, &settings);
        let mut gpu = create_renderer(BackendKind::Gpu, &settings);

        cpu.initialize(&mut cpu_canvas, w, h).unwrap();
        match gpu.initialize(&mut gpu_canvas, w, h) {
            Ok(()) => {}
            Err(e) if e.to_string().contains("no gpu adapter available") => return,
            Err(e) => panic!("unexpected gpu init error: {e}"),
        }

        cpu.render_frame(&y, &u, &v).unwrap();
        gpu.render_frame(&y, &u, &v).unwrap();

        let a = cpu.surface().unwrap().data();
        let b = gpu.surface().unwrap().data();
        for (i, (pa, pb)) in a.chunks_exact(4).zip(b.chunks_exact(4)).enumerate() {
            for ch in 0..3 {
                let d = (i16::from(pa[ch]) - i16::from(pb[ch])).abs();
                assert!(d <= 3, "pixel {i} channel {ch}: {pa:?} vs {pb:?}");
            }
            assert_eq!(pb[3], 255);
        }
    }
}
