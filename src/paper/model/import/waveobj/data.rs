use std::io::BufRead;
use anyhow::{Result, anyhow, bail};
use log::warn;

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct FaceVertex {
    v: u32,
    t: Option<u32>,
    n: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct Face {
    verts: Vec<FaceVertex>,
}

#[derive(Clone, Debug, Default)]
pub struct Model {
    vs: Vec<[f64; 3]>,
    n_ns: usize,
    n_ts: usize,
    faces: Vec<Face>,
}

// OBJ indices are 1-based, negative ones count backwards from the last element read
fn solve_index(word: &str, len: usize, what: &str) -> Result<u32> {
    let idx: i64 = word.parse()?;
    let solved = match idx {
        0 => bail!("{what} index 0 is not valid"),
        1 .. => idx - 1,
        _ => len as i64 + idx,
    };
    if solved < 0 || solved >= len as i64 {
        bail!("{what} index {idx} out of range");
    }
    Ok(solved as u32)
}

fn coords<const N: usize>(words: &mut std::str::SplitWhitespace) -> Result<[f64; N]> {
    let mut res = [0.0; N];
    for x in &mut res {
        *x = words.next().ok_or_else(|| anyhow!("invalid obj syntax"))?.parse()?;
    }
    Ok(res)
}

impl Model {
    pub fn from_reader<R: BufRead>(r: R) -> Result<Model> {
        let syn_error = || anyhow!("invalid obj syntax");

        let mut data = Model::default();

        for (num, line) in r.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            //skip empty and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut words = line.split_whitespace();
            let first = words.next().ok_or_else(syn_error)?;
            match first {
                "v" => {
                    data.vs.push(coords(&mut words)?);
                }
                "vt" => {
                    // only the first coordinate is required
                    words.next().ok_or_else(syn_error)?.parse::<f64>()?;
                    data.n_ts += 1;
                }
                "vn" => {
                    coords::<3>(&mut words)?;
                    data.n_ns += 1;
                }
                "f" => {
                    let mut verts = Vec::new();
                    for fv in words {
                        // v, v/t, v/t/n or v//n
                        let mut vals = fv.split('/');
                        let v = solve_index(vals.next().ok_or_else(syn_error)?, data.vs.len(), "vertex")?;
                        let t = match vals.next() {
                            None | Some("") => None,
                            Some(t) => Some(solve_index(t, data.n_ts, "texture")?),
                        };
                        let n = match vals.next() {
                            None | Some("") => None,
                            Some(n) => Some(solve_index(n, data.n_ns, "normal")?),
                        };
                        if vals.next().is_some() {
                            return Err(syn_error());
                        }
                        verts.push(FaceVertex { v, t, n });
                    }
                    data.faces.push(Face { verts });
                }
                // objects, groups and materials are all merged into a single mesh
                "o" | "g" | "s" | "mtllib" | "usemtl" | "l" | "p" => {}
                p => {
                    warn!("unknown OBJ keyword {p:?} in line {}", num + 1);
                }
            }
        }

        Ok(data)
    }
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }
    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vs
    }
    pub fn vertex_by_index(&self, idx: u32) -> &[f64; 3] {
        &self.vs[idx as usize]
    }
}

impl Face {
    pub fn vertices(&self) -> &[FaceVertex] {
        &self.verts
    }
}

impl FaceVertex {
    pub fn v(&self) -> u32 {
        self.v
    }
    pub fn n(&self) -> Option<u32> {
        self.n
    }
    pub fn t(&self) -> Option<u32> {
        self.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_vertex_forms() {
        let obj = "# a square
o square
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vn 0 0 1
f 1 2/1 3/1/1 4//1
f -4 -3 -2
";
        let model = Model::from_reader(obj.as_bytes()).unwrap();
        assert_eq!(model.vertices().len(), 4);
        assert_eq!(model.faces().len(), 2);
        let fv = model.faces()[0].vertices();
        assert_eq!((fv[0].v(), fv[0].t(), fv[0].n()), (0, None, None));
        assert_eq!((fv[1].v(), fv[1].t(), fv[1].n()), (1, Some(0), None));
        assert_eq!((fv[2].v(), fv[2].t(), fv[2].n()), (2, Some(0), Some(0)));
        assert_eq!((fv[3].v(), fv[3].t(), fv[3].n()), (3, None, Some(0)));
        let vs: Vec<u32> = model.faces()[1].vertices().iter().map(|fv| fv.v()).collect();
        assert_eq!(vs, [0, 1, 2]);
        assert_eq!(model.vertex_by_index(2), &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn bad_indices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n";
        assert!(Model::from_reader(obj.as_bytes()).is_err());
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n";
        assert!(Model::from_reader(obj.as_bytes()).is_err());
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/1 2 3\n";
        assert!(Model::from_reader(obj.as_bytes()).is_err());
        let obj = "v 0 0\n";
        assert!(Model::from_reader(obj.as_bytes()).is_err());
    }

    #[test]
    fn unknown_keywords_are_skipped() {
        let obj = "mtllib x.mtl\nusemtl red\ncstype bezier\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let model = Model::from_reader(obj.as_bytes()).unwrap();
        assert_eq!(model.faces().len(), 1);
    }
}
