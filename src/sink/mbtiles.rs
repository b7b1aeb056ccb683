//! The MBTiles sink: one SQLite database instead of many PBF files
//! (spec §6 "Output — MBTiles").

use std::path::Path;
use std::rc::Rc;

use rusqlite::{params, Connection};

use crate::element::{Bound, Element};
use crate::error::SplitResult;
use crate::tile::TileCoord;

use super::pbf_files::ElementEncodeFn;
use super::{RunSummary, Sink, TileEncoder};

pub struct MbtilesSink {
    conn: Rc<Connection>,
    name: String,
    encode: ElementEncodeFn,
}

impl MbtilesSink {
    pub fn create(path: &Path, name: impl Into<String>, encode: ElementEncodeFn) -> SplitResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tiles (
                 zoom_level INTEGER,
                 tile_column INTEGER,
                 tile_row INTEGER,
                 tile_data BLOB
             );
             CREATE UNIQUE INDEX IF NOT EXISTS tiles_index ON tiles (zoom_level, tile_column, tile_row);
             CREATE TABLE IF NOT EXISTS metadata (name TEXT, value TEXT);",
        )?;
        Ok(Self { conn: Rc::new(conn), name: name.into(), encode })
    }
}

impl Sink for MbtilesSink {
    type Encoder = MbtilesEncoder;

    fn encoder_for(&mut self, tile: TileCoord, zoom: u8) -> SplitResult<Self::Encoder> {
        Ok(MbtilesEncoder {
            conn: Rc::clone(&self.conn),
            tile,
            zoom,
            buffer: Vec::new(),
            encode: self.encode,
        })
    }

    fn finish(&mut self, summary: &RunSummary) -> SplitResult<()> {
        let bounds = format!(
            "{},{},{},{}",
            summary.bounds.min_lon, summary.bounds.min_lat, summary.bounds.max_lon, summary.bounds.max_lat
        );
        let rows: [(&str, String); 8] = [
            ("format", "application/vnd.openstreetmap.data+pbf".to_string()),
            ("minzoom", summary.min_zoom.to_string()),
            ("maxzoom", summary.max_zoom.to_string()),
            ("bounds", bounds),
            ("latest_date", summary.latest_date.to_string()),
            ("name", self.name.clone()),
            ("type", "baselayer".to_string()),
            ("version", "0.2.0".to_string()),
        ];
        for (key, value) in rows {
            self.conn
                .execute("INSERT INTO metadata (name, value) VALUES (?1, ?2)", params![key, value])?;
        }
        self.conn.execute(
            "INSERT INTO metadata (name, value) VALUES ('attribution', ?1)",
            params!["OpenStreetMap Contributors ODbL 1.0"],
        )?;
        Ok(())
    }
}

pub struct MbtilesEncoder {
    conn: Rc<Connection>,
    tile: TileCoord,
    zoom: u8,
    buffer: Vec<u8>,
    encode: ElementEncodeFn,
}

impl TileEncoder for MbtilesEncoder {
    fn open(&mut self, _tile: TileCoord, _zoom: u8, bound: Bound) -> SplitResult<()> {
        self.buffer.extend((self.encode)(&Element::Bound(bound))?);
        Ok(())
    }

    fn push(&mut self, element: &Element<'_>) -> SplitResult<()> {
        self.buffer.extend((self.encode)(element)?);
        Ok(())
    }

    fn close(&mut self) -> SplitResult<()> {
        // MBTiles stores rows under the TMS y-axis convention (spec §6).
        let y_tms = (1u32 << self.zoom) - 1 - self.tile.y;
        self.conn.execute(
            "INSERT OR REPLACE INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)",
            params![self.zoom, self.tile.x, y_tms, self.buffer],
        )?;
        Ok(())
    }
}
