/// PyQGIS batch script: NDVI for every raster in a folder, clipped to a
/// boundary layer. `@NAME@` markers are substituted by the writer.
pub const PYQGIS_NDVI: &str = r#""""
PyQGIS: batch NDVI + boundary clip for Landsat 8/9 and Sentinel-2 imagery
Region: @REGION@
Generated: @DATE@

Run from the QGIS Python console after editing the paths below.
"""

import os

import processing
from qgis.analysis import QgsRasterCalculator, QgsRasterCalculatorEntry
from qgis.core import QgsProject, QgsRasterLayer, QgsVectorLayer

# ---------------------------------------------------------------------------
# Paths
# ---------------------------------------------------------------------------
INPUT_FOLDER = r"@INPUT_FOLDER@"
OUTPUT_FOLDER = r"@OUTPUT_FOLDER@"
SHAPEFILE_PATH = r"@SHAPEFILE_PATH@"

RASTER_EXTENSIONS = (".tif", ".tiff")

# (red, nir) band numbers per sensor
BANDS = {
    "Landsat": (4, 5),
    "Sentinel-2": (4, 8),
}


def detect_sensor(filename):
    name = filename.lower()
    if "sentinel" in name or "s2" in name:
        return "Sentinel-2"
    # LC08 / LC09 and anything unrecognised use Landsat band order
    return "Landsat"


def calculate_ndvi(layer, red_band, nir_band, output_path):
    nir = QgsRasterCalculatorEntry()
    nir.ref = "nir@1"
    nir.raster = layer
    nir.bandNumber = nir_band

    red = QgsRasterCalculatorEntry()
    red.ref = "red@1"
    red.raster = layer
    red.bandNumber = red_band

    calc = QgsRasterCalculator(
        "(nir@1 - red@1) / (nir@1 + red@1)",
        output_path,
        "GTiff",
        layer.extent(),
        layer.width(),
        layer.height(),
        [nir, red],
    )
    return calc.processCalculation() == 0


def clip_to_boundary(raster_path, boundary, output_path):
    result = processing.run(
        "gdal:cliprasterbymasklayer",
        {
            "INPUT": raster_path,
            "MASK": boundary,
            "NODATA": -9999,
            "CROP_TO_CUTLINE": True,
            "KEEP_RESOLUTION": True,
            "OUTPUT": output_path,
        },
    )
    return bool(result and result.get("OUTPUT"))


def main():
    os.makedirs(OUTPUT_FOLDER, exist_ok=True)

    boundary = QgsVectorLayer(SHAPEFILE_PATH, "@REGION@", "ogr")
    if not boundary.isValid():
        raise SystemExit(f"Could not load boundary layer: {SHAPEFILE_PATH}")
    QgsProject.instance().addMapLayer(boundary)
    print(f"Boundary: {boundary.featureCount()} features, CRS {boundary.crs().authid()}")

    rasters = sorted(
        os.path.join(INPUT_FOLDER, f)
        for f in os.listdir(INPUT_FOLDER)
        if f.lower().endswith(RASTER_EXTENSIONS)
    )
    if not rasters:
        raise SystemExit(f"No rasters found in {INPUT_FOLDER}")

    processed, failed = 0, 0
    for index, path in enumerate(rasters, 1):
        filename = os.path.basename(path)
        stem = os.path.splitext(filename)[0]
        print(f"[{index}/{len(rasters)}] {filename}")

        layer = QgsRasterLayer(path, filename)
        if not layer.isValid():
            print("  invalid raster, skipped")
            failed += 1
            continue

        sensor = detect_sensor(filename)
        red_band, nir_band = BANDS[sensor]
        print(f"  {sensor}: red={red_band} nir={nir_band}")

        ndvi_path = os.path.join(OUTPUT_FOLDER, f"{stem}_NDVI.tif")
        if not calculate_ndvi(layer, red_band, nir_band, ndvi_path):
            print("  NDVI calculation failed")
            failed += 1
            continue

        clipped_path = os.path.join(OUTPUT_FOLDER, f"{stem}_NDVI_clipped.tif")
        if not clip_to_boundary(ndvi_path, boundary, clipped_path):
            print("  clip failed")
            failed += 1
            continue

        os.remove(ndvi_path)
        processed += 1
        print(f"  saved {os.path.basename(clipped_path)}")

    print(f"Done: {processed} processed, {failed} failed, output in {OUTPUT_FOLDER}")

    if processed:
        first = next(f for f in sorted(os.listdir(OUTPUT_FOLDER)) if f.endswith("_clipped.tif"))
        QgsProject.instance().addMapLayer(QgsRasterLayer(os.path.join(OUTPUT_FOLDER, first), first))


main()
"#;
