use std::error::Error;
use std::time::Instant;
use tide_eval::geometry::{BoundingBox, Shape};
use tide_eval::{DataSet, Tide, ThresholdSchedule};

fn bbox(x: f32, y: f32, w: f32, h: f32) -> Result<Shape, Box<dyn Error>> {
    Ok(Shape::Box(BoundingBox::new(x, y, w, h)?))
}

/// Exercises the library end to end: a handful of ground truths and
/// predictions across two images, evaluated at the default COCO threshold
/// schedule.
fn main() -> Result<(), Box<dyn Error>> {
    let mut gts = DataSet::new("ground_truth", 100);
    gts.add_ground_truth(0, 1, bbox(10.0, 10.0, 50.0, 50.0)?, false)?;
    gts.add_ground_truth(1, 1, bbox(30.0, 30.0, 40.0, 40.0)?, false)?;

    let mut preds = DataSet::new("yolov11n", 100);
    preds.add_class(1, "person");
    preds.add_detection(0, 1, 0.92, bbox(10.0, 10.0, 50.0, 50.0)?)?;
    preds.add_detection(0, 1, 0.81, bbox(120.0, 120.0, 20.0, 20.0)?)?;
    preds.add_detection(1, 1, 0.40, bbox(32.0, 32.0, 20.0, 20.0)?)?;

    let now = Instant::now();
    let mut tide = Tide::new();
    let summary = tide.coco_summary(&gts, &preds, &ThresholdSchedule::default());
    println!("Time elapsed: {:?}", now.elapsed());
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
