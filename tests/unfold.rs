use papernet::paper::*;
use papernet::util_3d::{self, Vector2, Vector3};

// Corners and outwards faces of an axis-aligned cube
fn cube_parts(side: f64) -> (Vec<Vector3>, [[usize; 4]; 6]) {
    let mut positions = Vec::new();
    for i in 0 .. 8 {
        let c = |bit: usize| if i & bit != 0 { side } else { 0.0 };
        positions.push(Vector3::new(c(1), c(2), c(4)));
    }
    let faces = [
        [0, 2, 3, 1],
        [4, 5, 7, 6],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
        [0, 4, 6, 2],
        [1, 3, 7, 5],
    ];
    (positions, faces)
}

fn cube(side: f64) -> Mesh {
    let (positions, faces) = cube_parts(side);
    let faces: Vec<Vec<usize>> = faces.iter().map(|f| f.to_vec()).collect();
    Mesh::from_polygons(positions, &faces).unwrap()
}

fn triangulated_cube(side: f64) -> Mesh {
    let (positions, faces) = cube_parts(side);
    let faces: Vec<Vec<usize>> = faces
        .iter()
        .flat_map(|&[a, b, c, d]| [vec![a, b, c], vec![a, c, d]])
        .collect();
    Mesh::from_polygons(positions, &faces).unwrap()
}

fn options(scale: f64) -> PaperOptions {
    PaperOptions {
        scale,
        ..PaperOptions::default()
    }
}

fn assert_every_face_once(pc: &Papercraft) {
    let mut seen = vec![0; pc.model().num_faces()];
    for (key, island) in pc.islands() {
        for &f in island.faces() {
            seen[usize::from(f)] += 1;
            assert_eq!(pc.island_by_face(f), key);
        }
    }
    assert!(seen.iter().all(|&n| n == 1), "{seen:?}");
}

fn assert_boundary_cycles(pc: &Papercraft) {
    for (_, island) in pc.islands() {
        let boundary = island.boundary();
        for &e in boundary {
            let right = pc.uv_edge(e).neighbor_right().unwrap();
            assert!(boundary.contains(&right));
            assert_eq!(pc.uv_edge(right).neighbor_left(), Some(e));
        }
        // walking right from any uvedge comes back to it
        let start = boundary[0];
        let mut e = start;
        for _ in 0 .. boundary.len() {
            e = pc.uv_edge(e).neighbor_right().unwrap();
            if e == start {
                break;
            }
        }
        assert_eq!(e, start);
    }
}

fn page_rects(pc: &Papercraft) -> Vec<Vec<(Vector2, Vector2)>> {
    pc.pages()
        .iter()
        .map(|page| {
            page.islands()
                .iter()
                .map(|&key| {
                    let island = pc.island_by_key(key).unwrap();
                    (island.pos(), island.pos() + island.bounding_box())
                })
                .collect()
        })
        .collect()
}

#[test]
fn cube_unfolds_in_one_piece() {
    let mut pc = Papercraft::new(cube(1.0), options(1.0));
    pc.generate_cuts(None).unwrap();
    assert_eq!(pc.num_islands(), 1);
    assert_every_face_once(&pc);
    // a net of six squares is a tree of five joins
    let joined = pc.model().edges().filter(|(e, _)| !pc.edge_state(*e).is_main_cut()).count();
    assert_eq!(joined, 5);
}

#[test]
fn small_bound_splits_the_cube() {
    let mut pc = Papercraft::new(cube(1.0), options(1.0));
    pc.generate_cuts(Some(Vector2::new(2.5, 2.5))).unwrap();
    assert!(pc.num_islands() > 1);
    assert_every_face_once(&pc);
    for (_, island) in pc.islands() {
        // four squares never fit in 2.5 x 2.5 without overlapping
        assert!(island.faces().len() <= 3);
    }
    pc.finalize_topology();
    assert_boundary_cycles(&pc);
}

#[test]
fn triangulated_cube_unfolds_in_one_piece() {
    let uniform = PriorityEffect {
        convex: 1.0,
        concave: 1.0,
        length: 1.0,
    };
    for effect in [PriorityEffect::default(), uniform] {
        let mesh = triangulated_cube(1.0);
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_faces(), 12);
        let mut opts = options(1.0);
        opts.priority_effect = effect;
        let mut pc = Papercraft::new(mesh, opts);
        pc.generate_cuts(None).unwrap();
        assert_eq!(pc.num_islands(), 1, "{effect:?}");
        assert_every_face_once(&pc);
        pc.finalize_topology();
        assert_boundary_cycles(&pc);
    }
}

#[test]
fn small_bound_splits_the_triangulated_cube() {
    let mut pc = Papercraft::new(triangulated_cube(1.0), options(1.0));
    pc.generate_cuts(Some(Vector2::new(2.5, 2.5))).unwrap();
    assert!(pc.num_islands() > 1);
    assert_every_face_once(&pc);
    for (_, island) in pc.islands() {
        // the diagonals go first, then at most three squares
        assert!(island.faces().len() <= 6);
    }

    // the same on a small page, through the whole pipeline
    let mut opts = options(20.0);
    opts.limit_by_page = true;
    opts.create_stickers = false;
    opts.page_size = (70.0, 70.0);
    let pc = Papercraft::unfold(triangulated_cube(1.0), opts).unwrap();
    assert!(pc.num_islands() > 1);
    assert_every_face_once(&pc);
}

#[test]
fn triangulated_cube_preserves_area() {
    let scale = 10.0;
    let mesh = triangulated_cube(2.0);
    let area = mesh.total_area();
    assert!((area - 24.0).abs() < 1e-9);
    let pc = Papercraft::unfold(mesh, options(scale)).unwrap();
    assert_eq!(pc.num_islands(), 1);
    let total: f64 = pc.islands().map(|(key, _)| pc.island_area(key)).sum();
    assert!((total - area * scale * scale).abs() < 1e-6, "{total}");
    assert_boundary_cycles(&pc);
}

#[test]
fn page_limit_leaves_room_for_stickers() {
    // squares of 20 mm on a 60 mm cage: three in a row fit, but not with their stickers
    let mut opts = options(20.0);
    opts.limit_by_page = true;
    opts.page_size = (70.0, 70.0);
    let pc = Papercraft::unfold(cube(1.0), opts).unwrap();
    assert!(pc.num_islands() > 1);
    let cage = pc.options().printable_size();
    for (_, island) in pc.islands() {
        let bb = island.bounding_box();
        assert!(bb.x <= cage.x + 1e-9 && bb.y <= cage.y + 1e-9, "{bb:?}");
        assert!(island.faces().len() <= 3);
    }
}

#[test]
fn forced_cut_never_joins() {
    let mut mesh = cube(1.0);
    let forced: Vec<EdgeIndex> = [(0, 1), (0, 2), (0, 4), (7, 3)]
        .iter()
        .map(|&(a, b)| mesh.set_force_cut(a, b, true).unwrap())
        .collect();
    let pc = Papercraft::unfold(mesh, options(10.0)).unwrap();
    for e in forced {
        assert!(pc.edge_state(e).is_main_cut());
    }
    assert_every_face_once(&pc);
}

#[test]
fn full_unfold_preserves_area() {
    let scale = 10.0;
    let mesh = cube(2.0);
    let area = mesh.total_area();
    let pc = Papercraft::unfold(mesh, options(scale)).unwrap();
    let total: f64 = pc.islands().map(|(key, _)| pc.island_area(key)).sum();
    assert!((total - area * scale * scale).abs() < 1e-6, "{total}");
    assert_boundary_cycles(&pc);
    for (_, island) in pc.islands() {
        assert!(!island.is_inside_out());
    }
}

#[test]
fn islands_on_a_page_do_not_overlap() {
    // limited to a small page, so there are several islands to pack
    let mut opts = options(75.0);
    opts.limit_by_page = true;
    opts.page_size = (200.0, 200.0);
    let mut pc = Papercraft::unfold(cube(1.0), opts).unwrap();
    assert!(pc.num_islands() > 1);
    let cage = pc.options().printable_size();

    let rects = page_rects(&pc);
    let placed: usize = rects.iter().map(|r| r.len()).sum();
    assert_eq!(placed, pc.num_islands());
    for page in &rects {
        for (i, &(a0, a1)) in page.iter().enumerate() {
            assert!(a0.x >= 0.0 && a0.y >= 0.0);
            assert!(a1.x <= cage.x + 1e-9 && a1.y <= cage.y + 1e-9);
            for &(b0, b1) in &page[i + 1 ..] {
                let apart = a1.x <= b0.x || b1.x <= a0.x || a1.y <= b0.y || b1.y <= a0.y;
                assert!(apart, "{a0:?} {a1:?} overlaps {b0:?} {b1:?}");
            }
        }
    }

    // packing again gives the same pages
    let pages = pc.pages().to_vec();
    pc.pack_islands().unwrap();
    assert_eq!(pc.pages(), &pages[..]);
    assert_eq!(page_rects(&pc), rects);
}

#[test]
fn flat_edges_count_as_convex() {
    // a flat square made of two triangles
    let positions = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(1.0, 1.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    ];
    let mesh = Mesh::from_polygons(positions, &[vec![0, 1, 2], vec![0, 2, 3]]).unwrap();
    let diagonal = mesh.edge_between(VertexIndex::from(0), VertexIndex::from(2)).unwrap();
    let effect = PriorityEffect {
        convex: 0.5,
        concave: 1.0,
        length: -0.05,
    };
    let mut opts = options(1.0);
    opts.priority_effect = effect;
    let mut pc = Papercraft::new(mesh, opts);
    assert_eq!(pc.edge_state(diagonal).angle(), 0.0);
    pc.generate_cuts(None).unwrap();
    // the only joinable edge is the average one
    assert_eq!(pc.edge_state(diagonal).priority(), effect.priority(0.0, 1.0, 1.0));
    assert_eq!(pc.edge_state(diagonal).priority(), -0.05);
    assert_eq!(pc.num_islands(), 1);
}

#[test]
fn degenerate_faces_are_listed() {
    let positions = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(2.0, 0.0, 0.0),
    ];
    // the second triangle is just a line
    let mesh = Mesh::from_polygons(positions, &[vec![0, 1, 2], vec![0, 3, 1]]).unwrap();
    match Papercraft::unfold(mesh, options(1.0)) {
        Err(UnfoldError::Degenerate { null_edges, null_faces, twisted_faces }) => {
            assert!(null_edges.is_empty());
            assert_eq!(null_faces, [FaceIndex::from(1)]);
            assert!(twisted_faces.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn island_too_big_for_the_page() {
    let positions = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1000.0, 0.0, 0.0),
        Vector3::new(1000.0, 1000.0, 0.0),
        Vector3::new(0.0, 1000.0, 0.0),
    ];
    let mesh = Mesh::from_polygons(positions, &[vec![0, 1, 2, 3]]).unwrap();
    let err = Papercraft::unfold(mesh, options(1.0)).unwrap_err();
    assert!(matches!(err, UnfoldError::IslandTooBig { .. }), "{err}");
}

#[test]
fn document_covers_every_island() {
    let mut opts = options(40.0);
    opts.limit_by_page = true;
    let pc = Papercraft::unfold(cube(1.0), opts).unwrap();
    let doc = pc.to_document();
    let islands: Vec<&NetIsland> = doc.pages.iter().flat_map(|p| &p.islands).collect();
    assert_eq!(islands.len(), pc.num_islands());
    let faces: usize = islands.iter().map(|i| i.faces.len()).sum();
    assert_eq!(faces, 6);
    for island in islands {
        assert!(!island.outlines.is_empty());
        for face in &island.faces {
            let polygon: Vec<Vector2> = face.vertices.iter().map(|&[x, y]| Vector2::new(x, y)).collect();
            assert!((util_3d::polygon_area(&polygon).abs() - 1600.0).abs() < 1e-6);
        }
    }
}
