use image::{ImageFormat, ImageBuffer, Luma};
use plate_stabilizer::config::{parse_key_values, BatchConfig};
use plate_stabilizer::error::ClassifierError;
use plate_stabilizer::{
    BatchContext, BatchOrchestrator, FlipDecision, OrientationCheck, OrientationClassifier,
    PredictionClient,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// 路径中含有指定孔位时判定为镜像，其余为方向正确
struct WellCheck {
    mirrored_well: &'static str,
}

impl OrientationCheck for WellCheck {
    fn check(
        &self,
        sequence_dir: &Path,
    ) -> impl Future<Output = Result<FlipDecision, ClassifierError>> {
        let mirrored = sequence_dir
            .components()
            .any(|c| c.as_os_str() == self.mirrored_well);
        async move {
            Ok(if mirrored {
                FlipDecision::FlipNeeded
            } else {
                FlipDecision::NoFlip
            })
        }
    }
}

fn write_config(root: &Path, read: &str, points: &str, extra: &str) -> BatchConfig {
    let text = format!(
        "InputFolder={}\nOutputFolder={}\nLogFolder={}\nReadFolders={}\nCreateFolders=A01,A02,B01\n\
         BrightFoldersPoint={}\nDebug=False\nAvance=True\nVisor=False\nDev=False\n\
         ENDPOINT=http://127.0.0.1:9/unused\nPREDICTION_KEY=key\n{}",
        root.join("in").display(),
        root.join("out").display(),
        root.join("logs").display(),
        read,
        points,
        extra
    );
    BatchConfig::from_map(&parse_key_values(&text), root).unwrap()
}

/// 写入一个 16 位灰度序列，亮度从左到右递增
fn write_sequence(dir: &Path, frames: u16) {
    std::fs::create_dir_all(dir).unwrap();
    for i in 0..frames {
        let frame: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(4, 2, |x, _| Luma([x as u16 * 1000 + i]));
        frame
            .save_with_format(dir.join(format!("{:05}.TIFF", i)), ImageFormat::Tiff)
            .unwrap();
    }
}

/// 第一帧第一行的像素
fn first_row(avi: &Path) -> Vec<u8> {
    let bytes = std::fs::read(avi).unwrap();
    let data = bytes.windows(4).position(|w| w == b"00db").unwrap() + 8;
    bytes[data..data + 4].to_vec()
}

fn output(root: &Path, well: &str, name: &str) -> PathBuf {
    root.join("out").join(well).join(name)
}

#[tokio::test]
async fn test_batch_with_missing_directory_continues() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let config = write_config(root, "A01,A02", "P1,P2", "");
    write_sequence(&root.join("in/A01/P1"), 3);
    write_sequence(&root.join("in/A01/P2"), 3);
    write_sequence(&root.join("in/A02/P2"), 3);
    // A02/P1 不存在

    let orchestrator = BatchOrchestrator::new(&config, WellCheck { mirrored_well: "none" });
    let ctx = BatchContext::new(&config);
    let report = orchestrator.run(&ctx).await.unwrap();

    assert_eq!(report.total, 4);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(format!("{:.2}", ctx.progress.percentage()), "100.00");

    assert!(output(root, "A01", "P1.avi").is_file());
    assert!(output(root, "A02", "P2.avi").is_file());
    assert!(!output(root, "A02", "P1.avi").exists());
    // CreateFolders 中的孔位都已创建
    assert!(root.join("out/B01").is_dir());
}

#[tokio::test]
async fn test_flip_applied_only_to_mirrored_units() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let config = write_config(root, "A01,A02", "P1", "");
    write_sequence(&root.join("in/A01/P1"), 2);
    write_sequence(&root.join("in/A02/P1"), 2);

    let orchestrator = BatchOrchestrator::new(&config, WellCheck { mirrored_well: "A02" });
    let report = orchestrator.run(&BatchContext::new(&config)).await.unwrap();
    assert_eq!(report.succeeded, 2);

    let upright = first_row(&output(root, "A01", "P1.avi"));
    let flipped = first_row(&output(root, "A02", "P1.avi"));
    assert!(upright[0] < upright[3]);
    assert!(flipped[0] > flipped[3]);
    let mut reversed = upright.clone();
    reversed.reverse();
    assert_eq!(flipped, reversed);
}

#[tokio::test]
async fn test_point_with_subfolder_and_truncated_name() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let config = write_config(root, "A01", "POINT 00001\\BRIGHT", "");
    write_sequence(&root.join("in/A01/POINT 00001/BRIGHT"), 2);

    let orchestrator = BatchOrchestrator::new(&config, WellCheck { mirrored_well: "none" });
    let report = orchestrator.run(&BatchContext::new(&config)).await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert!(output(root, "A01", "POINT 00001.avi").is_file());
}

#[tokio::test]
async fn test_failed_unit_does_not_stop_batch() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let config = write_config(root, "A01", "P1,P2,P3", "");
    write_sequence(&root.join("in/A01/P1"), 2);
    // P2 存在但没有帧
    std::fs::create_dir_all(root.join("in/A01/P2")).unwrap();
    write_sequence(&root.join("in/A01/P3"), 2);

    let orchestrator = BatchOrchestrator::new(&config, WellCheck { mirrored_well: "none" });
    let ctx = BatchContext::new(&config);
    let report = orchestrator.run(&ctx).await.unwrap();

    assert_eq!((report.succeeded, report.skipped, report.failed), (2, 0, 1));
    assert_eq!(ctx.progress.processed(), 3);
    assert!(output(root, "A01", "P3.avi").is_file());
}

#[tokio::test]
async fn test_parallel_units_match_sequential_report() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let config = write_config(root, "A01,A02,B01", "P1,P2", "MaxConcurrentUnits=4\n");
    for well in ["A01", "A02"] {
        for point in ["P1", "P2"] {
            write_sequence(&root.join("in").join(well).join(point), 2);
        }
    }

    let orchestrator = BatchOrchestrator::new(&config, WellCheck { mirrored_well: "A01" });
    let ctx = BatchContext::new(&config);
    let report = orchestrator.run(&ctx).await.unwrap();

    assert_eq!(report.total, 6);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.skipped, 2);
    assert_eq!(ctx.progress.percentage(), 100.0);
}

/// 本地回环上的分类服务，对每个请求都返回同一个响应
async fn serve_predictions(body: &'static str) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 8192];
            loop {
                let n = socket.read(&mut buf).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .and_then(|v| v.trim().parse::<usize>().ok())
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    (format!("http://{}/classify/image", addr), handle)
}

#[tokio::test]
async fn test_http_classifier_end_to_end() {
    let (url, server) = serve_predictions(
        r#"{"predictions":[
            {"tagName":"Izquierda","probability":0.1},
            {"tagName":"Derecha","probability":0.85}
        ]}"#,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let config = write_config(root, "A01", "P1", "");
    write_sequence(&root.join("in/A01/P1"), 2);

    let client = PredictionClient::new(url, "key", Duration::from_secs(5)).unwrap();
    let orchestrator = BatchOrchestrator::new(&config, OrientationClassifier::new(client));
    let report = orchestrator.run(&BatchContext::new(&config)).await.unwrap();
    server.abort();

    assert_eq!(report.succeeded, 1);
    // 首帧预览已导出到序列目录
    assert!(root.join("in/A01/P1/_TIFF_JPG.jpg").is_file());
    // 判定为镜像，输出已翻转
    let row = first_row(&output(root, "A01", "P1.avi"));
    assert!(row[0] > row[3]);
}

#[tokio::test]
async fn test_unreachable_classifier_degrades_to_no_flip() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let config = write_config(root, "A01", "P1", "RequestTimeoutSecs=2\n");
    write_sequence(&root.join("in/A01/P1"), 2);

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url = format!("http://{}/x", addr);
    let client = PredictionClient::new(url, "key", Duration::from_secs(2)).unwrap();
    let orchestrator = BatchOrchestrator::new(&config, OrientationClassifier::new(client));
    let report = orchestrator.run(&BatchContext::new(&config)).await.unwrap();

    assert_eq!(report.succeeded, 1);
    let row = first_row(&output(root, "A01", "P1.avi"));
    assert!(row[0] < row[3]);
}
