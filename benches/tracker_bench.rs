//! Benchmark suite for wellness-algo
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wellness_algo::{
    compute_ear, EarSmoother, EmotionScores, FaceBox, FaceObservation, FrameObservation,
    MemoryStore, Point2D, TrackerConfig, TrackerError, TrackingSession,
};

fn eye_points(open: f64) -> Vec<Point2D> {
    let h = 1.5 * open;
    vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(1.0, h),
        Point2D::new(2.0, h),
        Point2D::new(3.0, 0.0),
        Point2D::new(2.0, -h),
        Point2D::new(1.0, -h),
    ]
}

fn face_frame(ear: f64) -> FrameObservation {
    let mut emotions = EmotionScores::default();
    emotions.neutral = 0.7;
    FrameObservation::Face(FaceObservation {
        bbox: FaceBox {
            x: 0.0,
            y: 0.0,
            width: 200.0,
            height: 200.0,
        },
        left_eye: eye_points(ear),
        right_eye: eye_points(ear),
        emotions,
    })
}

fn bench_compute_ear(c: &mut Criterion) {
    let points = eye_points(0.3);
    c.bench_function("compute_ear", |b| {
        b.iter(|| compute_ear(black_box(&points)))
    });
}

fn bench_smoother_update(c: &mut Criterion) {
    c.bench_function("EarSmoother::update", |b| {
        let mut smoother = EarSmoother::default();
        b.iter(|| smoother.update(black_box(0.27)))
    });
}

fn bench_session_advance(c: &mut Criterion) {
    c.bench_function("TrackingSession::advance/face_frame", |b| {
        let mut session = TrackingSession::with_seed(
            TrackerConfig::default(),
            Box::new(MemoryStore::new()),
            "bench",
            Some(1),
        );
        session.start(0, Err(TrackerError::CameraUnavailable));
        let mut now = 0i64;
        b.iter(|| {
            now += 33;
            session.advance(now, Some(face_frame(black_box(0.3))))
        })
    });
}

criterion_group!(
    benches,
    bench_compute_ear,
    bench_smoother_update,
    bench_session_advance
);
criterion_main!(benches);
