//! 真实 Shell 上的端到端测试，只在 Windows 上编译。
#![cfg(target_os = "windows")]

use std::fs;

use shell_preview::{ErrorKind, PreviewConfig, ShellPreview};

/// 写出纯色 PNG，作为已知宽高比的源媒体。
fn solid_png(dir: &tempfile::TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
    let path = dir.path().join(name);
    image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 200]))
        .save(&path)
        .unwrap();
    path
}

fn text_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("sample.txt");
    fs::write(&path, "shell preview sample\n").unwrap();
    path
}

#[test]
fn icon_for_text_file_is_requested_square() {
    let dir = tempfile::tempdir().unwrap();
    let input = text_file(&dir);
    let preview = ShellPreview::new(PreviewConfig::default()).unwrap();

    // 纯文本没有缩略图，退化为通用文档图标并填充到请求尺寸
    let handle = preview.get_icon(&input, 128).unwrap();
    assert_eq!((handle.width(), handle.height()), (128, 128));
    preview.release(handle);
}

#[test]
fn icon_saves_as_bmp() {
    let dir = tempfile::tempdir().unwrap();
    let input = text_file(&dir);
    let output = dir.path().join("icon.bmp");
    let preview = ShellPreview::new(PreviewConfig::default()).unwrap();

    let handle = preview.get_icon(&input, 64).unwrap();
    preview.save_to_file(&handle, &output).unwrap();
    preview.release(handle);

    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[..2], b"BM");
}

#[test]
fn icon_saves_as_png_with_same_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let input = text_file(&dir);
    let output = dir.path().join("icon.PNG");
    let preview = ShellPreview::new(PreviewConfig::default()).unwrap();

    let handle = preview.get_icon(&input, 96).unwrap();
    let dims = (handle.width(), handle.height());
    preview.save_to_file(&handle, &output).unwrap();
    preview.release(handle);

    let decoded = image::open(&output).unwrap();
    assert_eq!((decoded.width(), decoded.height()), dims);
}

#[test]
fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let preview = ShellPreview::new(PreviewConfig::default()).unwrap();

    let err = preview
        .get_thumbnail(dir.path().join("missing.jpg"), 128)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn zero_size_is_invalid_argument() {
    let dir = tempfile::tempdir().unwrap();
    let input = text_file(&dir);
    let preview = ShellPreview::new(PreviewConfig::default()).unwrap();

    let err = preview.get_preview(&input, 0, 100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn wide_thumbnail_keeps_source_aspect() {
    let dir = tempfile::tempdir().unwrap();
    let input = solid_png(&dir, "wide.png", 400, 200);
    let preview = ShellPreview::new(PreviewConfig::default()).unwrap();

    let handle = preview.get_thumbnail(&input, 128).unwrap();
    assert_eq!(handle.width(), 128);
    assert!(handle.height() > 0 && handle.height() <= 64);
    preview.release(handle);
}

#[test]
fn tall_thumbnail_keeps_source_aspect() {
    let dir = tempfile::tempdir().unwrap();
    let input = solid_png(&dir, "tall.png", 100, 300);
    let preview = ShellPreview::new(PreviewConfig::default()).unwrap();

    let handle = preview.get_thumbnail(&input, 128).unwrap();
    assert_eq!(handle.height(), 128);
    assert!(handle.width() > 0 && handle.width() <= 43);
    preview.release(handle);
}

#[test]
fn square_thumbnail_is_not_cropped() {
    let dir = tempfile::tempdir().unwrap();
    let input = solid_png(&dir, "square.png", 300, 300);
    let preview = ShellPreview::new(PreviewConfig::default()).unwrap();

    let handle = preview.get_thumbnail(&input, 128).unwrap();
    assert_eq!(handle.width(), handle.height());
    preview.release(handle);
}

#[test]
fn text_preview_round_trips_through_png() {
    let dir = tempfile::tempdir().unwrap();
    let input = text_file(&dir);
    let output = dir.path().join("preview.png");
    let config = PreviewConfig {
        preview_settle_ms: 300,
        ..PreviewConfig::default()
    };
    let preview = ShellPreview::new(config).unwrap();

    let handle = preview.get_preview(&input, 320, 240).unwrap();
    let dims = (handle.width(), handle.height());
    assert!(dims.0 > 0 && dims.1 > 0);
    preview.save_to_file(&handle, &output).unwrap();
    preview.release(handle);

    let decoded = image::open(&output).unwrap();
    assert_eq!((decoded.width(), decoded.height()), dims);
}
