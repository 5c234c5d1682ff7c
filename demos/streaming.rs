//! Chunked transfer in both directions: POST a chunked body to have it
//! echoed back chunk by chunk, GET anything to receive a streamed counter.

use stoker::{Request, Response, Server};

fn stream_count(req: &mut Request, n: u32) {
    let mut chunk = Response::new();
    if n == 0 {
        chunk.status(200);
        chunk.header("Content-Type", "text/plain");
    }
    chunk.body(format!("tick {}\n", n));
    req.respond_chunk(chunk, move |req| {
        if n < 9 {
            stream_count(req, n + 1);
        } else {
            req.respond_chunk_end(Response::new());
        }
    });
}

fn echo_chunks(req: &mut Request) {
    req.read_chunk(|req| {
        let body = req.chunk().to_vec();
        if body.is_empty() {
            req.respond_chunk_end(Response::new());
        } else {
            let mut chunk = Response::new();
            chunk.status(200);
            chunk.body(body);
            req.respond_chunk(chunk, echo_chunks);
        }
    });
}

fn handle(req: &mut Request) {
    if req.header("transfer-encoding").is_some() {
        echo_chunks(req);
    } else {
        stream_count(req, 0);
    }
}

fn main() -> std::io::Result<()> {
    env_logger::init();
    let mut server = Server::new(8080, handle)?;
    println!("listening on {}", server.local_addr());
    server.run()
}
