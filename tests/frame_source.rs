use std::{io::ErrorKind, path::PathBuf};

use planeview::{FrameDims, I420Frame, I420Reader, PlaneviewError};

fn scratch_dir() -> PathBuf {
    let dir = PathBuf::from("target").join("frame_source");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn reads_every_frame_from_a_file() {
    let dims = FrameDims::new(8, 4).unwrap();
    let frames = [
        I420Frame::filled(dims, 16, 128, 128),
        I420Frame::filled(dims, 235, 128, 128),
        I420Frame::filled(dims, 81, 90, 240),
    ];
    let mut raw = Vec::new();
    for f in &frames {
        raw.extend_from_slice(&f.to_bytes());
    }

    let path = scratch_dir().join("three.yuv");
    std::fs::write(&path, &raw).unwrap();

    let read: Vec<I420Frame> = I420Reader::open(&path, dims)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(read, frames);
}

#[test]
fn skip_frames_stops_at_end_of_stream() {
    let dims = FrameDims::new(4, 4).unwrap();
    let mut raw = I420Frame::filled(dims, 1, 2, 3).to_bytes();
    raw.extend(I420Frame::filled(dims, 4, 5, 6).to_bytes());

    let mut r = I420Reader::new(std::io::Cursor::new(raw), dims);
    assert_eq!(r.skip_frames(1).unwrap(), 1);
    let second = r.next_frame().unwrap().unwrap();
    assert_eq!(second, I420Frame::filled(dims, 4, 5, 6));
    assert_eq!(r.skip_frames(5).unwrap(), 0);
    assert_eq!(r.position(), 2);
}

#[test]
fn truncated_frame_is_an_io_error() {
    let dims = FrameDims::new(4, 4).unwrap();
    let mut raw = I420Frame::filled(dims, 16, 128, 128).to_bytes();
    raw.truncate(raw.len() - 1);

    let mut r = I420Reader::new(std::io::Cursor::new(raw), dims);
    match r.next_frame() {
        Err(PlaneviewError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
        other => panic!("expected truncated frame error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dims = FrameDims::new(4, 4).unwrap();
    let path = scratch_dir().join("does_not_exist.yuv");
    let _ = std::fs::remove_file(&path);
    assert!(matches!(
        I420Reader::open(&path, dims),
        Err(PlaneviewError::Io(_))
    ));
}
