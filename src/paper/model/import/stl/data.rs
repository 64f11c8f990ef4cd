use std::io::Read;
use anyhow::{Result, anyhow, bail};

use crate::paper::import::*;

#[derive(Debug)]
pub struct Stl {
    tris: Vec<Triangle>,
}

#[derive(Debug)]
pub struct Triangle {
    pub normal: Vector3,
    pub vertices: [Vector3; 3],
}

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

impl Stl {
    pub fn new<R: Read>(mut f: R) -> Result<Stl> {
        let mut data = Vec::new();
        f.read_to_end(&mut data)?;
        // Some binary files also start with "solid", trust the triangle count for those
        let is_text = data.starts_with(b"solid") && binary_len(&data) != Some(data.len());
        if is_text {
            let text = std::str::from_utf8(&data).map_err(|_| anyhow!("text STL is not valid UTF-8"))?;
            Self::new_text(text)
        } else {
            Self::new_binary(&data)
        }
    }
    fn new_binary(data: &[u8]) -> Result<Stl> {
        if data.len() < HEADER_LEN {
            bail!("truncated STL header");
        }
        let rdr = &mut &data[HEADER_LEN ..];
        let n_tris = read_u32(rdr)?;
        let mut tris = Vec::with_capacity((n_tris as usize).min(rdr.len() / TRIANGLE_LEN));
        for _ in 0 .. n_tris {
            let normal = read_vector3_f32(rdr)?;
            let v0 = read_vector3_f32(rdr)?;
            let v1 = read_vector3_f32(rdr)?;
            let v2 = read_vector3_f32(rdr)?;
            let _attr = read_u16(rdr)?;
            tris.push(Triangle {
                normal,
                vertices: [v0, v1, v2],
            })
        }
        Ok(Stl {
            tris,
        })
    }
    fn new_text(text: &str) -> Result<Stl> {
        let mut words = text.split_ascii_whitespace();
        let mut tris = Vec::new();
        let mut normal = Vector3::new(0.0, 0.0, 0.0);
        let mut vertices = Vec::with_capacity(3);
        // "solid NAME" is skipped with the rest of unknown words
        while let Some(w) = words.next() {
            match w {
                "normal" => {
                    normal = Vector3::new(number(&mut words)?, number(&mut words)?, number(&mut words)?);
                }
                "vertex" => {
                    vertices.push(Vector3::new(number(&mut words)?, number(&mut words)?, number(&mut words)?));
                }
                "endfacet" => {
                    let Ok(vs) = <[Vector3; 3]>::try_from(std::mem::take(&mut vertices)) else {
                        bail!("facet #{} without 3 vertices", tris.len());
                    };
                    tris.push(Triangle {
                        normal,
                        vertices: vs,
                    });
                }
                "endsolid" => break,
                _ => {}
            }
        }
        Ok(Stl {
            tris,
        })
    }
    pub fn triangles(&self) -> &[Triangle] {
        &self.tris
    }
}

fn number<'a>(words: &mut impl Iterator<Item = &'a str>) -> Result<f64> {
    let w = words.next().ok_or_else(|| anyhow!("expected number"))?;
    Ok(w.parse()?)
}

fn binary_len(data: &[u8]) -> Option<usize> {
    let count = data.get(HEADER_LEN .. HEADER_LEN + 4)?;
    let n = read_u32(&mut &count[..]).ok()?;
    Some(HEADER_LEN + 4 + TRIANGLE_LEN * n as usize)
}
