//! Python driver generated for each detector invocation.
//!
//! The driver text only varies with the invocation kind. Paths, thresholds
//! and codec settings reach it through argv.

use crate::background::processors::invoker::InvocationKind;

const PRELUDE: &str = r#"import argparse
import json
import os
import sys

EMPTY_RESULT = {
    "detections": [],
    "total_objects": 0,
    "overall_threat_level": "NONE",
    "overall_threat_score": 0.0,
    "threat_count": 0,
}


def parse_args():
    parser = argparse.ArgumentParser()
    parser.add_argument("--input", required=True)
    parser.add_argument("--output", required=True)
    parser.add_argument("--model", required=True)
    parser.add_argument("--confidence", type=float, required=True)
    parser.add_argument("--detector-dir", required=True)
    parser.add_argument("--fourcc", default="mp4v")
    parser.add_argument("--frame-stride", type=int, default=1)
    parser.add_argument("--frames-dir", default=".")
    return parser.parse_args()


def load_detector(args):
    if not os.path.exists(args.input) or not os.path.exists(args.model):
        return None
    detector = ThreatDetector(
        model_path=args.model, confidence_threshold=args.confidence, verbose=False
    )
    if not detector.model:
        return None
    return detector


def convert(threats):
    detections = []
    for threat in threats:
        bbox = threat["bounding_box"]
        detections.append(
            {
                "class": threat["class"],
                "confidence": threat["confidence"],
                "threat_level": threat["threat_level"],
                "bbox": [bbox["x1"], bbox["y1"], bbox["width"], bbox["height"]],
            }
        )
    return detections

"#;

const IMAGE_BODY: &str = r#"
def run(args):
    detector = load_detector(args)
    if detector is None:
        return None

    result = detector.detect_threats(args.input)
    if not result["success"]:
        return None

    detections = convert(result["threats"])
    annotated = detector.create_annotated_image(args.input, result, args.output)
    if not annotated:
        import shutil

        shutil.copy2(args.input, args.output)

    return {
        "detections": detections,
        "total_objects": len(detections),
        "overall_threat_level": result["overall_threat_level"],
        "overall_threat_score": result["overall_threat_score"],
        "threat_count": result["threat_count"],
    }

"#;

const VIDEO_BODY: &str = r#"
import cv2


def run(args):
    detector = load_detector(args)
    if detector is None:
        return None

    cap = cv2.VideoCapture(args.input)
    if not cap.isOpened():
        print(f"Could not open video: {args.input}")
        return None

    fps = int(cap.get(cv2.CAP_PROP_FPS)) or 25
    width = int(cap.get(cv2.CAP_PROP_FRAME_WIDTH))
    height = int(cap.get(cv2.CAP_PROP_FRAME_HEIGHT))
    fourcc = cv2.VideoWriter_fourcc(*args.fourcc)
    out = cv2.VideoWriter(args.output, fourcc, fps, (width, height))
    os.makedirs(args.frames_dir, exist_ok=True)

    frame_count = 0
    detections = []
    frame_scores = []
    while True:
        ok, frame = cap.read()
        if not ok:
            break

        if frame_count % max(args.frame_stride, 1) != 0:
            out.write(frame)
            frame_count += 1
            continue

        frame_path = os.path.join(args.frames_dir, f"frame_{frame_count}.jpg")
        annotated_path = os.path.join(args.frames_dir, f"annotated_{frame_count}.jpg")
        cv2.imwrite(frame_path, frame)
        result = detector.detect_threats(frame_path)

        written = False
        if result["success"] and result["threats"]:
            detections.extend(convert(result["threats"]))
            frame_scores.append(result["overall_threat_score"])
            annotated = detector.create_annotated_image(frame_path, result, annotated_path)
            if annotated and os.path.exists(annotated):
                out.write(cv2.imread(annotated))
                os.remove(annotated)
                written = True
        if not written:
            out.write(frame)

        if os.path.exists(frame_path):
            os.remove(frame_path)
        frame_count += 1

    cap.release()
    out.release()
    print(f"Processed {frame_count} frames")

    return {
        "detections": detections,
        "total_objects": len(detections),
        "frame_count": frame_count,
        "frame_scores": frame_scores,
        "overall_threat_level": "NONE",
        "overall_threat_score": 0.0,
        "threat_count": len(detections),
    }

"#;

const MAIN: &str = r#"
if __name__ == "__main__":
    args = parse_args()
    sys.path.insert(0, args.detector_dir)
    # Import failures exit non-zero; only detection itself degrades to empty.
    from threat_detector import ThreatDetector

    try:
        result = run(args)
    except Exception as exc:
        print(f"Detection error: {exc}", file=sys.stderr)
        result = None
    print(json.dumps(result if result is not None else EMPTY_RESULT))
"#;

pub fn render_script(kind: &InvocationKind) -> String {
    let body = match kind {
        InvocationKind::Image => IMAGE_BODY,
        InvocationKind::Video { .. } => VIDEO_BODY,
    };
    let mut script = String::with_capacity(PRELUDE.len() + body.len() + MAIN.len());
    script.push_str(PRELUDE);
    script.push_str(body);
    script.push_str(MAIN);
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::VideoContainer;

    #[test]
    fn image_script_has_no_frame_loop() {
        let script = render_script(&InvocationKind::Image);
        assert!(script.contains("detect_threats(args.input)"));
        assert!(!script.contains("cv2.VideoCapture"));
        assert!(script.ends_with("print(json.dumps(result if result is not None else EMPTY_RESULT))\n"));
    }

    #[test]
    fn video_script_reports_frame_scores() {
        let script = render_script(&InvocationKind::Video {
            container: VideoContainer::Avi,
            frame_stride: 3,
        });
        assert!(script.contains("cv2.VideoCapture"));
        assert!(script.contains("\"frame_scores\": frame_scores"));
        // Runtime values travel through argv, never through the source text.
        assert!(!script.contains("XVID"));
    }

    #[test]
    fn detector_import_is_outside_the_fallback() {
        let script = render_script(&InvocationKind::Image);
        let import = script.find("from threat_detector import").unwrap();
        let guarded = script.find("    try:\n        result = run(args)").unwrap();
        assert!(import < guarded);
    }

    #[cfg(unix)]
    mod driver {
        use std::path::{Path, PathBuf};
        use tempfile::TempDir;
        use uuid::Uuid;

        use crate::background::processors::invoker::{
            DetectionInvocation, InvocationOutput, invoke,
        };
        use crate::background::processors::parser::summarize;
        use crate::background::processors::workspace::{RequestWorkspace, Workspace};
        use crate::config::DetectorConfig;
        use crate::models::detection::{DetectionSummary, ThreatLevel};
        use crate::models::media::{MediaKind, UploadedMedia};

        // Reports one threat whose confidence is the threshold plus 0.5, so
        // the parsed `--confidence` value shows up in the output.
        const STUB_DETECTOR: &str = r#"
class ThreatDetector:
    def __init__(self, model_path, confidence_threshold, verbose=False):
        self.model = model_path
        self.confidence_threshold = confidence_threshold

    def detect_threats(self, path):
        return {
            "success": True,
            "threats": [
                {
                    "class": "mines",
                    "confidence": self.confidence_threshold + 0.5,
                    "threat_level": "CRITICAL",
                    "bounding_box": {"x1": 1, "y1": 2, "width": 3, "height": 4},
                }
            ],
            "overall_threat_level": "CRITICAL",
            "overall_threat_score": 0.9,
            "threat_count": 1,
        }

    def create_annotated_image(self, path, result, output):
        with open(output, "wb") as handle:
            handle.write(b"annotated")
        return output
"#;

        fn python_available() -> bool {
            std::process::Command::new("python3")
                .arg("--version")
                .output()
                .is_ok_and(|output| output.status.success())
        }

        struct Fixture {
            tmp: TempDir,
            request: RequestWorkspace,
            media: UploadedMedia,
            detector_dir: PathBuf,
            model_path: PathBuf,
        }

        async fn fixture() -> Fixture {
            let tmp = tempfile::tempdir().unwrap();
            let workspace = Workspace::ensure(tmp.path().join("workspace")).unwrap();
            let request = workspace.request(Uuid::new_v4()).await.unwrap();

            let detector_dir = tmp.path().join("detection");
            std::fs::create_dir(&detector_dir).unwrap();
            std::fs::write(detector_dir.join("threat_detector.py"), STUB_DETECTOR).unwrap();
            let model_path = tmp.path().join("best.pt");
            std::fs::write(&model_path, b"weights").unwrap();

            let input_path = request.input_path("reef", "jpg");
            std::fs::write(&input_path, b"raw").unwrap();
            let media = UploadedMedia {
                request_id: request.id,
                original_filename: "reef.jpg".to_string(),
                stem: "reef".to_string(),
                extension: "jpg".to_string(),
                kind: MediaKind::Image,
                input_path,
            };

            Fixture {
                tmp,
                request,
                media,
                detector_dir,
                model_path,
            }
        }

        async fn run(
            fixture: &Fixture,
            model_path: &Path,
            detector_dir: &Path,
        ) -> (DetectionInvocation, InvocationOutput) {
            let config = DetectorConfig {
                python_path: "python3".to_string(),
                model_path: model_path.to_path_buf(),
                detector_dir: detector_dir.to_path_buf(),
                confidence_threshold: 0.25,
                workspace_dir: fixture.tmp.path().join("workspace"),
                ..DetectorConfig::default()
            };
            let invocation = DetectionInvocation::build(&fixture.media, &fixture.request, &config);
            invocation.stage_script().await.unwrap();
            let output = invoke(&invocation, None).await.unwrap();
            (invocation, output)
        }

        #[tokio::test]
        async fn image_driver_reports_detections_and_writes_output() {
            if !python_available() {
                return;
            }
            let fixture = fixture().await;

            let (invocation, output) =
                run(&fixture, &fixture.model_path, &fixture.detector_dir).await;

            assert_eq!(output.exit_code, Some(0), "stderr: {}", output.stderr);
            let summary = summarize(&output.stdout, invocation.kind);
            assert_eq!(summary.total_objects, 1);
            assert_eq!(summary.detections[0].class_label, "mines");
            assert_eq!(summary.detections[0].confidence, 0.75);
            assert_eq!(summary.overall_threat_level, ThreatLevel::Critical);
            assert_eq!(std::fs::read(&invocation.output_path).unwrap(), b"annotated");
        }

        #[tokio::test]
        async fn missing_model_prints_empty_result() {
            if !python_available() {
                return;
            }
            let fixture = fixture().await;
            let absent = fixture.tmp.path().join("absent.pt");

            let (invocation, output) = run(&fixture, &absent, &fixture.detector_dir).await;

            assert_eq!(output.exit_code, Some(0), "stderr: {}", output.stderr);
            assert_eq!(summarize(&output.stdout, invocation.kind), DetectionSummary::empty());
            assert!(!invocation.output_path.exists());
        }

        #[tokio::test]
        async fn missing_detector_module_exits_non_zero() {
            if !python_available() {
                return;
            }
            let fixture = fixture().await;
            let nowhere = fixture.tmp.path().join("no-such-dir");

            let (invocation, output) = run(&fixture, &fixture.model_path, &nowhere).await;

            assert!(!output.success);
            assert!(output.stderr.contains("threat_detector"), "stderr: {}", output.stderr);
            assert!(output.into_stdout(invocation.kind).is_err());
        }
    }
}
