//! Non-maximum suppression
//!
//! Grid-mode region selection runs the detector once per band, so the same
//! player can be reported several times with slightly shifted boxes. NMS
//! collapses those duplicates before prompts are handed to the tracker.

use stereo_core::{BBox, Detection};

/// Intersection-over-union of two boxes. Zero when either box has no area.
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    let iw = (ix2 - ix1).max(0.0);
    let ih = (iy2 - iy1).max(0.0);
    let intersection = iw * ih;

    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Greedy non-maximum suppression.
///
/// Detections are visited highest-confidence first (ties keep their input
/// order); each kept box suppresses every remaining box whose IoU with it
/// meets `iou_threshold`.
pub fn apply_nms(detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.len() < 2 {
        return detections;
    }

    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| {
        detections[b]
            .confidence
            .partial_cmp(&detections[a].confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut suppressed = vec![false; detections.len()];
    let mut kept = Vec::new();

    for (pos, &i) in order.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        kept.push(i);
        for &j in &order[pos + 1..] {
            if !suppressed[j] && iou(&detections[i].bbox, &detections[j].bbox) >= iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    // Preserve the sorted (confidence-descending) order of kept boxes.
    let mut keep_flags = vec![false; detections.len()];
    for &i in &kept {
        keep_flags[i] = true;
    }
    order
        .into_iter()
        .filter(|&i| keep_flags[i])
        .map(|i| detections[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, conf: f32) -> Detection {
        Detection {
            bbox: BBox { x1, y1, x2, y2 },
            class_id: 0,
            confidence: conf,
        }
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = BBox {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
        };
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = BBox {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
        };
        let b = BBox {
            x1: 20.0,
            y1: 20.0,
            x2: 30.0,
            y2: 30.0,
        };
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_zero_area_box() {
        let a = BBox {
            x1: 5.0,
            y1: 5.0,
            x2: 5.0,
            y2: 15.0,
        };
        let b = BBox {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
        };
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.9),
            det(1.0, 1.0, 11.0, 11.0, 0.8),
            det(50.0, 50.0, 60.0, 60.0, 0.7),
        ];
        let kept = apply_nms(detections, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.7);
    }

    #[test]
    fn test_nms_keeps_below_threshold() {
        // IoU of these two is well under 0.45.
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.9),
            det(8.0, 8.0, 18.0, 18.0, 0.8),
        ];
        let kept = apply_nms(detections, 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_tie_keeps_input_order() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.5),
            det(0.0, 0.0, 10.0, 10.0, 0.5),
        ];
        let kept = apply_nms(detections, 0.45);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].bbox.x1, 0.0);
    }

    #[test]
    fn test_nms_empty_input() {
        assert!(apply_nms(Vec::new(), 0.45).is_empty());
    }

    #[test]
    fn test_nms_single_detection_passthrough() {
        let detections = vec![det(0.0, 0.0, 10.0, 10.0, 0.1)];
        let kept = apply_nms(detections.clone(), 0.45);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_nms_output_sorted_by_confidence() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.3),
            det(100.0, 0.0, 110.0, 10.0, 0.9),
            det(50.0, 0.0, 60.0, 10.0, 0.6),
        ];
        let kept = apply_nms(detections, 0.45);
        let confs: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(confs, vec![0.9, 0.6, 0.3]);
    }
}
