//! Media analyzer: downloads stored image references and measures them.
//!
//! Per image: deny-list check, bounded download with retry, decode,
//! dimensions/format/color-mode/transparency/aspect, an 8×8 average hash,
//! optional EXIF (GPS reduced to decimal coordinates, MakerNote dropped),
//! dominant colors via k-means on a thumbnail with a web-safe palette
//! mapping, and deterministic content hints from entropy and edge density.
//!
//! Failures are recorded, not raised: a failed row gets `analysis_error`
//! and `analyzed_at` so reruns skip it. Video and audio rows are stored by
//! discovery but never analyzed here.

use anyhow::{bail, Result};
use futures::future::join_all;
use image::{DynamicImage, GenericImageView};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::time::Duration;

use crate::config::{Config, MediaConfig};
use crate::models::{now_timestamp, Media};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::Store;

/// Everything measured from one decoded image.
#[derive(Debug, Clone, Default)]
pub struct ImageAnalysis {
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub format: Option<String>,
    pub color_mode: String,
    pub has_transparency: bool,
    pub aspect_ratio: f64,
    pub image_hash: String,
    pub dominant_colors: Vec<DominantColor>,
    pub websafe_colors: BTreeMap<String, f64>,
    pub exif: Option<serde_json::Value>,
    pub content_tags: Vec<String>,
}

/// One palette entry, ordered by coverage.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DominantColor {
    pub rgb: [u8; 3],
    pub hex: String,
    pub hsv: [f64; 3],
    pub name: String,
    pub percentage: f64,
}

/// Options for one `land medianalyse` run.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOptions {
    pub max_depth: Option<i64>,
    pub min_relevance: Option<i64>,
    /// Re-evaluate media that already carry `analyzed_at`.
    pub reanalyze: bool,
    /// Delete media whose measured dimensions violate the configured
    /// minimums. Caller must have confirmed with the operator.
    pub purge: bool,
}

/// Analyze a land's image media. Returns `(processed, errors)`.
pub async fn analyze_land(
    config: &Config,
    store: &Store,
    land_name: &str,
    options: AnalyzeOptions,
    progress: &dyn ProgressReporter,
) -> Result<(u64, u64)> {
    let Some(land) = store.get_land(land_name).await? else {
        bail!("Land \"{}\" not found", land_name);
    };

    let deny = compile_deny_patterns(&config.media)?;
    let client = reqwest::Client::builder()
        .user_agent(&config.crawl.user_agent)
        .timeout(Duration::from_secs(config.media.download_timeout_secs))
        .build()?;

    let media_rows = store
        .media_for_analysis(
            land.id,
            options.max_depth,
            options.min_relevance,
            options.reanalyze,
        )
        .await?;

    let mut processed = 0u64;
    let mut errors = 0u64;
    let window = config.crawl.parallel_connections.max(1);
    let total_batches = media_rows.len().div_ceil(window);

    for (index, batch) in media_rows.chunks(window).enumerate() {
        progress.report(ProgressEvent::Batch {
            verb: format!("medianalyse {}", land.name),
            n: index as u64 + 1,
            total: total_batches as u64,
            items: batch.len() as u64,
        });

        let downloads = batch.iter().map(|media| {
            let client = client.clone();
            let denied = deny.iter().any(|re| re.is_match(&media.url));
            let url = media.url.clone();
            let media_config = config.media.clone();
            async move {
                if denied {
                    return Err("URL matches media deny list".to_string());
                }
                download_with_retry(&client, &url, &media_config).await
            }
        });
        let results = join_all(downloads).await;

        for (media, result) in batch.iter().zip(results) {
            let mut row = media.clone();
            let outcome = result.and_then(|bytes| analyze_image_bytes(&bytes, &config.media));
            match outcome {
                Ok(analysis) => {
                    write_analysis(&mut row, &analysis);
                    store.save_media(&row).await?;
                    processed += 1;
                }
                Err(message) => {
                    // Purge mode removes rows that violate the size
                    // thresholds instead of recording the rejection.
                    if options.purge && message.starts_with("image too small") {
                        store.delete_media_by_id(row.id).await?;
                        processed += 1;
                        continue;
                    }
                    row.analysis_error = Some(message);
                    row.analyzed_at = Some(now_timestamp());
                    store.save_media(&row).await?;
                    errors += 1;
                }
            }
        }
    }
    Ok((processed, errors))
}

fn compile_deny_patterns(config: &MediaConfig) -> Result<Vec<Regex>> {
    config
        .deny_patterns
        .iter()
        .map(|p| Regex::new(p).map_err(Into::into))
        .collect()
}

async fn download_with_retry(
    client: &reqwest::Client,
    url: &str,
    config: &MediaConfig,
) -> Result<Vec<u8>, String> {
    let mut last_err = String::new();
    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_secs(1u64 << (attempt - 1).min(4))).await;
        }
        let response = match client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                last_err = format!("download failed: {}", e);
                continue;
            }
        };
        if !response.status().is_success() {
            last_err = format!("download failed: HTTP {}", response.status());
            continue;
        }
        if let Some(length) = response.content_length() {
            if length > config.max_file_size {
                return Err(format!("file too large ({} bytes)", length));
            }
        }
        match response.bytes().await {
            Ok(bytes) => {
                if bytes.len() as u64 > config.max_file_size {
                    return Err(format!("file too large ({} bytes)", bytes.len()));
                }
                return Ok(bytes.to_vec());
            }
            Err(e) => {
                last_err = format!("download failed: {}", e);
            }
        }
    }
    Err(last_err)
}

fn write_analysis(row: &mut Media, analysis: &ImageAnalysis) {
    row.width = Some(analysis.width as i64);
    row.height = Some(analysis.height as i64);
    row.file_size = Some(analysis.file_size as i64);
    row.format = analysis.format.clone();
    row.color_mode = Some(analysis.color_mode.clone());
    row.has_transparency = Some(analysis.has_transparency);
    row.aspect_ratio = Some(analysis.aspect_ratio);
    row.image_hash = Some(analysis.image_hash.clone());
    row.dominant_colors = serde_json::to_string(&analysis.dominant_colors).ok();
    row.websafe_colors = serde_json::to_string(&analysis.websafe_colors).ok();
    row.exif_data = analysis
        .exif
        .as_ref()
        .and_then(|e| serde_json::to_string(e).ok());
    row.content_tags = serde_json::to_string(&analysis.content_tags).ok();
    // No local NSFW classifier; the column stays empty rather than inventing
    // a number.
    row.nsfw_score = None;
    row.analyzed_at = Some(now_timestamp());
    row.analysis_error = None;
}

/// Decode and measure one image. Errors are strings destined for
/// `analysis_error`.
pub fn analyze_image_bytes(bytes: &[u8], config: &MediaConfig) -> Result<ImageAnalysis, String> {
    let format = image::guess_format(bytes)
        .ok()
        .map(|f| format!("{:?}", f).to_uppercase());
    let img =
        image::load_from_memory(bytes).map_err(|e| format!("image decode failed: {}", e))?;

    let (width, height) = img.dimensions();
    if width < config.min_width || height < config.min_height {
        return Err(format!(
            "image too small ({}x{} < {}x{})",
            width, height, config.min_width, config.min_height
        ));
    }

    let mut analysis = ImageAnalysis {
        width,
        height,
        file_size: bytes.len() as u64,
        format,
        color_mode: color_mode_name(&img).to_string(),
        has_transparency: has_transparency(&img),
        aspect_ratio: if height > 0 {
            ((width as f64 / height as f64) * 100.0).round() / 100.0
        } else {
            0.0
        },
        image_hash: average_hash(&img),
        ..ImageAnalysis::default()
    };

    if config.extract_colors {
        analysis.dominant_colors = dominant_colors(&img, config.n_dominant_colors);
        analysis.websafe_colors = websafe_palette(&analysis.dominant_colors);
    }
    if config.extract_exif {
        analysis.exif = extract_exif(bytes);
    }
    analysis.content_tags = content_tags(&img, &analysis);

    Ok(analysis)
}

fn color_mode_name(img: &DynamicImage) -> &'static str {
    use image::ColorType::*;
    match img.color() {
        L8 | L16 => "L",
        La8 | La16 => "LA",
        Rgb8 | Rgb16 | Rgb32F => "RGB",
        Rgba8 | Rgba16 | Rgba32F => "RGBA",
        _ => "RGB",
    }
}

fn has_transparency(img: &DynamicImage) -> bool {
    if !img.color().has_alpha() {
        return false;
    }
    img.to_rgba8().pixels().any(|p| p.0[3] < 255)
}

/// 8×8 average hash over a grayscale thumbnail, 16 hex chars. Bit-identical
/// inputs hash equal; same-size re-encodes stay within a small Hamming
/// distance (threshold 5, see tests).
pub fn average_hash(img: &DynamicImage) -> String {
    let small = image::imageops::resize(
        &img.to_luma8(),
        8,
        8,
        image::imageops::FilterType::Triangle,
    );
    let sum: u64 = small.pixels().map(|p| p.0[0] as u64).sum();
    let mean = sum / 64;
    let mut bits: u64 = 0;
    for (i, pixel) in small.pixels().enumerate() {
        if pixel.0[0] as u64 > mean {
            bits |= 1 << (63 - i);
        }
    }
    format!("{:016x}", bits)
}

/// Hamming distance between two hex hashes of equal width.
pub fn hash_distance(a: &str, b: &str) -> u32 {
    match (u64::from_str_radix(a, 16), u64::from_str_radix(b, 16)) {
        (Ok(a), Ok(b)) => (a ^ b).count_ones(),
        _ => u32::MAX,
    }
}

/// K-means over a 100×100 thumbnail with deterministic seeding (centroids
/// start evenly spaced through the pixel array).
fn dominant_colors(img: &DynamicImage, k: usize) -> Vec<DominantColor> {
    let thumb = img.thumbnail_exact(100, 100).to_rgb8();
    let pixels: Vec<[f64; 3]> = thumb
        .pixels()
        .map(|p| [p.0[0] as f64, p.0[1] as f64, p.0[2] as f64])
        .collect();
    if pixels.is_empty() {
        return Vec::new();
    }
    let k = k.min(pixels.len()).max(1);

    let mut centroids: Vec<[f64; 3]> = (0..k)
        .map(|i| pixels[i * pixels.len() / k])
        .collect();
    let mut assignment = vec![0usize; pixels.len()];

    for _ in 0..10 {
        for (pixel_index, pixel) in pixels.iter().enumerate() {
            let mut best = 0;
            let mut best_distance = f64::MAX;
            for (centroid_index, centroid) in centroids.iter().enumerate() {
                let distance = squared_distance(pixel, centroid);
                if distance < best_distance {
                    best_distance = distance;
                    best = centroid_index;
                }
            }
            assignment[pixel_index] = best;
        }
        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (pixel, &cluster) in pixels.iter().zip(&assignment) {
            for channel in 0..3 {
                sums[cluster][channel] += pixel[channel];
            }
            counts[cluster] += 1;
        }
        for cluster in 0..k {
            if counts[cluster] > 0 {
                centroids[cluster] = [
                    sums[cluster][0] / counts[cluster] as f64,
                    sums[cluster][1] / counts[cluster] as f64,
                    sums[cluster][2] / counts[cluster] as f64,
                ];
            }
        }
    }

    let mut counts = vec![0usize; k];
    for &cluster in &assignment {
        counts[cluster] += 1;
    }
    let total = pixels.len() as f64;
    let mut clusters: Vec<(usize, [f64; 3])> = counts.into_iter().zip(centroids).collect();
    clusters.sort_by(|a, b| b.0.cmp(&a.0));

    clusters
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, centroid)| {
            let rgb = [
                centroid[0].round().clamp(0.0, 255.0) as u8,
                centroid[1].round().clamp(0.0, 255.0) as u8,
                centroid[2].round().clamp(0.0, 255.0) as u8,
            ];
            let hsv = rgb_to_hsv(rgb);
            DominantColor {
                rgb,
                hex: format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]),
                hsv,
                name: color_name(rgb, hsv).to_string(),
                percentage: (count as f64 / total * 10_000.0).round() / 100.0,
            }
        })
        .collect()
}

fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

fn rgb_to_hsv(rgb: [u8; 3]) -> [f64; 3] {
    let r = rgb[0] as f64 / 255.0;
    let g = rgb[1] as f64 / 255.0;
    let b = rgb[2] as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    [
        (hue * 10.0).round() / 10.0,
        (saturation * 1000.0).round() / 1000.0,
        (max * 1000.0).round() / 1000.0,
    ]
}

/// Approximate color name from HSV.
fn color_name(_rgb: [u8; 3], hsv: [f64; 3]) -> &'static str {
    let [hue, saturation, value] = hsv;
    if value < 0.12 {
        return "black";
    }
    if saturation < 0.12 {
        return if value > 0.85 { "white" } else { "gray" };
    }
    if value < 0.5 && (15.0..50.0).contains(&hue) {
        return "brown";
    }
    match hue {
        h if h < 15.0 || h >= 345.0 => "red",
        h if h < 45.0 => "orange",
        h if h < 70.0 => "yellow",
        h if h < 160.0 => "green",
        h if h < 200.0 => "cyan",
        h if h < 260.0 => "blue",
        h if h < 300.0 => "purple",
        _ => "pink",
    }
}

const WEBSAFE_LEVELS: [u8; 6] = [0, 51, 102, 153, 204, 255];

fn to_websafe_channel(value: u8) -> u8 {
    *WEBSAFE_LEVELS
        .iter()
        .min_by_key(|&&level| (level as i32 - value as i32).abs())
        .expect("non-empty palette")
}

/// Quantize dominant colors to the 216-color web-safe palette, summing
/// percentages of colors that collapse onto the same entry.
fn websafe_palette(colors: &[DominantColor]) -> BTreeMap<String, f64> {
    let mut palette: BTreeMap<String, f64> = BTreeMap::new();
    for color in colors {
        let websafe = [
            to_websafe_channel(color.rgb[0]),
            to_websafe_channel(color.rgb[1]),
            to_websafe_channel(color.rgb[2]),
        ];
        let hex = format!("#{:02x}{:02x}{:02x}", websafe[0], websafe[1], websafe[2]);
        *palette.entry(hex).or_insert(0.0) += color.percentage;
    }
    palette
}

/// EXIF as a flat JSON object. GPS coordinates are reduced to decimal
/// lat/long; MakerNote is dropped.
fn extract_exif(bytes: &[u8]) -> Option<serde_json::Value> {
    let reader = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let mut map = serde_json::Map::new();

    for field in reader.fields() {
        if field.tag == exif::Tag::MakerNote {
            continue;
        }
        match field.tag {
            exif::Tag::Make
            | exif::Tag::Model
            | exif::Tag::DateTime
            | exif::Tag::DateTimeOriginal
            | exif::Tag::Orientation
            | exif::Tag::PixelXDimension
            | exif::Tag::PixelYDimension
            | exif::Tag::Software => {
                map.insert(
                    format!("{}", field.tag),
                    serde_json::Value::String(field.display_value().to_string()),
                );
            }
            _ => {}
        }
    }

    if let Some(lat) = gps_decimal(&reader, exif::Tag::GPSLatitude, exif::Tag::GPSLatitudeRef) {
        map.insert("GPSLatitude".to_string(), serde_json::json!(lat));
    }
    if let Some(long) = gps_decimal(&reader, exif::Tag::GPSLongitude, exif::Tag::GPSLongitudeRef) {
        map.insert("GPSLongitude".to_string(), serde_json::json!(long));
    }

    if map.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(map))
    }
}

/// Degrees/minutes/seconds rationals → signed decimal degrees.
fn gps_decimal(reader: &exif::Exif, value_tag: exif::Tag, ref_tag: exif::Tag) -> Option<f64> {
    let field = reader.get_field(value_tag, exif::In::PRIMARY)?;
    let exif::Value::Rational(ref parts) = field.value else {
        return None;
    };
    if parts.len() < 3 {
        return None;
    }
    let degrees = parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0;
    let sign = reader
        .get_field(ref_tag, exif::In::PRIMARY)
        .and_then(|f| f.display_value().to_string().chars().next())
        .map(|c| if c == 'S' || c == 'W' { -1.0 } else { 1.0 })
        .unwrap_or(1.0);
    Some((degrees * sign * 1_000_000.0).round() / 1_000_000.0)
}

/// Deterministic content hints from simple signal statistics.
fn content_tags(img: &DynamicImage, analysis: &ImageAnalysis) -> Vec<String> {
    let luma = image::imageops::resize(
        &img.to_luma8(),
        64,
        64,
        image::imageops::FilterType::Triangle,
    );

    // Shannon entropy of the grayscale histogram, in bits.
    let mut histogram = [0u32; 256];
    for pixel in luma.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    let total = (luma.width() * luma.height()) as f64;
    let entropy: f64 = histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();

    // Fraction of pixels with a strong local gradient.
    let mut edges = 0u32;
    for y in 0..63u32 {
        for x in 0..63u32 {
            let here = luma.get_pixel(x, y).0[0] as i32;
            let right = luma.get_pixel(x + 1, y).0[0] as i32;
            let down = luma.get_pixel(x, y + 1).0[0] as i32;
            if (here - right).abs() + (here - down).abs() > 60 {
                edges += 1;
            }
        }
    }
    let edge_density = edges as f64 / (63.0 * 63.0);

    let top_share = analysis
        .dominant_colors
        .first()
        .map(|c| c.percentage)
        .unwrap_or(0.0);

    let mut tags = Vec::new();
    if top_share >= 60.0 || (analysis.has_transparency && top_share >= 40.0) {
        tags.push("logo".to_string());
    }
    if edge_density >= 0.25 && entropy <= 5.5 {
        tags.push("text".to_string());
    }
    if entropy <= 4.0 && edge_density >= 0.05 && !tags.contains(&"text".to_string()) {
        tags.push("screenshot".to_string());
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        DynamicImage::ImageRgb8(img)
    }

    fn config() -> MediaConfig {
        MediaConfig::default()
    }

    #[test]
    fn identical_bytes_hash_equal() {
        let img = solid(200, 200, [120, 10, 200]);
        let bytes = png_bytes(&img);
        let a = analyze_image_bytes(&bytes, &config()).unwrap();
        let b = analyze_image_bytes(&bytes, &config()).unwrap();
        assert_eq!(a.image_hash, b.image_hash);
        assert_eq!(a.image_hash.len(), 16);
    }

    #[test]
    fn reencoding_stays_within_hamming_threshold() {
        // Same pixels encoded as PNG and BMP: distance must stay <= 5.
        let mut img = RgbImage::new(160, 120);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]);
        }
        let dynamic = DynamicImage::ImageRgb8(img);
        let png = png_bytes(&dynamic);
        let mut bmp = Vec::new();
        dynamic
            .write_to(&mut Cursor::new(&mut bmp), image::ImageFormat::Bmp)
            .unwrap();

        let a = analyze_image_bytes(&png, &config()).unwrap();
        let b = analyze_image_bytes(&bmp, &config()).unwrap();
        assert!(hash_distance(&a.image_hash, &b.image_hash) <= 5);
    }

    #[test]
    fn rejects_undersized_images() {
        let img = solid(50, 50, [0, 0, 0]);
        let err = analyze_image_bytes(&png_bytes(&img), &config()).unwrap_err();
        assert!(err.contains("too small"));
    }

    #[test]
    fn measures_dimensions_and_aspect() {
        let img = solid(200, 100, [255, 0, 0]);
        let analysis = analyze_image_bytes(&png_bytes(&img), &config()).unwrap();
        assert_eq!(analysis.width, 200);
        assert_eq!(analysis.height, 100);
        assert_eq!(analysis.aspect_ratio, 2.0);
        assert_eq!(analysis.format.as_deref(), Some("PNG"));
        assert!(!analysis.has_transparency);
    }

    #[test]
    fn detects_transparency() {
        let img = RgbaImage::from_pixel(150, 150, Rgba([10, 10, 10, 100]));
        let analysis =
            analyze_image_bytes(&png_bytes(&DynamicImage::ImageRgba8(img)), &config()).unwrap();
        assert!(analysis.has_transparency);
        assert_eq!(analysis.color_mode, "RGBA");
    }

    #[test]
    fn solid_image_has_one_dominant_color() {
        let img = solid(200, 200, [200, 30, 30]);
        let analysis = analyze_image_bytes(&png_bytes(&img), &config()).unwrap();
        let top = &analysis.dominant_colors[0];
        assert_eq!(top.rgb, [200, 30, 30]);
        assert!(top.percentage > 99.0);
        assert_eq!(top.name, "red");
        // Solid color collapses onto a single web-safe entry at ~100%.
        let (hex, share) = analysis.websafe_colors.iter().next().unwrap();
        assert_eq!(hex, "#cc3333");
        assert!(*share > 99.0);
    }

    #[test]
    fn websafe_channel_quantization() {
        assert_eq!(to_websafe_channel(0), 0);
        assert_eq!(to_websafe_channel(25), 0);
        assert_eq!(to_websafe_channel(26), 51);
        assert_eq!(to_websafe_channel(128), 153);
        assert_eq!(to_websafe_channel(255), 255);
    }

    #[test]
    fn color_names_cover_the_wheel() {
        assert_eq!(color_name([255, 255, 255], rgb_to_hsv([255, 255, 255])), "white");
        assert_eq!(color_name([0, 0, 0], rgb_to_hsv([0, 0, 0])), "black");
        assert_eq!(color_name([128, 128, 128], rgb_to_hsv([128, 128, 128])), "gray");
        assert_eq!(color_name([255, 0, 0], rgb_to_hsv([255, 0, 0])), "red");
        assert_eq!(color_name([0, 180, 0], rgb_to_hsv([0, 180, 0])), "green");
        assert_eq!(color_name([0, 0, 255], rgb_to_hsv([0, 0, 255])), "blue");
    }

    #[test]
    fn deny_patterns_match_trackers() {
        let patterns = compile_deny_patterns(&config()).unwrap();
        let matches = |url: &str| patterns.iter().any(|re| re.is_match(url));
        assert!(matches("https://cdn.doubleclick.net/pic.jpg"));
        assert!(matches("https://example.com/ads/banner.png"));
        assert!(matches("https://www.google-analytics.com/collect.gif"));
        assert!(matches("https://facebook.com/tr?id=1"));
        assert!(!matches("https://example.com/photos/landscape.jpg"));
    }

    #[test]
    fn solid_logo_like_image_gets_logo_tag() {
        let img = solid(300, 300, [10, 90, 200]);
        let analysis = analyze_image_bytes(&png_bytes(&img), &config()).unwrap();
        assert!(analysis.content_tags.contains(&"logo".to_string()));
    }
}
