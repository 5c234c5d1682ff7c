use stoker::{Request, Response, Server};

fn handle(req: &mut Request) {
    let mut response = Response::new();
    response.status(200);
    response.header("Content-Type", "text/plain");
    match req.target() {
        b"/" => response.body("Hello, World!"),
        other => {
            let name = String::from_utf8_lossy(other.get(1..).unwrap_or_default());
            response.body(format!("Hello, {}!", name));
        }
    }
    req.respond(response);
}

fn main() -> std::io::Result<()> {
    env_logger::init();
    let mut server = Server::new(8080, handle)?;
    println!("listening on {}", server.local_addr());
    server.run()
}
